//! Sanitization options.

/// Per-stage toggles for the sanitization pipeline.
///
/// The default enables every stage; [`SanitizeOptions::minimal`] keeps only
/// glyph normalization, which is the same degraded mode the size-bypass
/// policy falls back to.
#[derive(Debug, Clone)]
pub struct SanitizeOptions {
    /// Enable glyph normalization (invisible/width folding).
    pub normalize_glyphs: bool,
    /// Enable duplicate-line and dangling-backslash removal.
    pub dedup_lines: bool,
    /// Enable heading/list marker normalization.
    pub normalize_structure: bool,
    /// Enable fenced-code-block repair.
    pub repair_fences: bool,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            normalize_glyphs: true,
            dedup_lines: true,
            normalize_structure: true,
            repair_fences: true,
        }
    }
}

impl SanitizeOptions {
    /// Creates options with every stage enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Glyph normalization only.
    pub fn minimal() -> Self {
        Self {
            normalize_glyphs: true,
            dedup_lines: false,
            normalize_structure: false,
            repair_fences: false,
        }
    }

    /// Disables duplicate-line removal.
    pub fn without_dedup(mut self) -> Self {
        self.dedup_lines = false;
        self
    }

    /// Disables heading/list marker normalization.
    pub fn without_structure(mut self) -> Self {
        self.normalize_structure = false;
        self
    }

    /// Disables fence repair.
    pub fn without_fence_repair(mut self) -> Self {
        self.repair_fences = false;
        self
    }
}

//! Per-invocation repair accounting.
//!
//! The pipeline has no error channel: the only observable difference between
//! "nothing needed fixing" and "something was repaired" is the output itself.
//! [`SanitizeReport`] makes that observable explicit by counting every rewrite
//! each stage applied, so callers (and the CLI `check` command) can inspect
//! what happened without diffing strings.

use serde::Serialize;

/// Counters for every repair the pipeline applied in one invocation.
///
/// All fields are zero/false for input that was already clean.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizeReport {
    /// Invisible/bidi-control code points removed by the glyph pass.
    pub glyphs_removed: usize,
    /// Exotic whitespace, tab, and asterisk variants folded to ASCII.
    pub glyphs_folded: usize,
    /// Dangling trailing backslashes stripped.
    pub backslashes_stripped: usize,
    /// Strictly adjacent verbatim duplicate lines dropped.
    pub duplicate_lines_dropped: usize,
    /// Adjacent heading/list lines dropped as structural duplicates.
    pub structural_duplicates_dropped: usize,
    /// Atx heading lines whose markers were rewritten.
    pub headings_normalized: usize,
    /// Bullet glyph list markers converted to `-`.
    pub bullets_normalized: usize,
    /// Synthetic closing fence lines inserted (early closes and end-of-input).
    pub fences_closed: usize,
    /// Opening fence lines split apart from inline code on the same line.
    pub inline_code_splits: usize,
    /// True when the fence-repair insertion budget ran out and one or more
    /// open fences were abandoned without a synthetic close.
    pub insertion_budget_exhausted: bool,
    /// True when the input exceeded the size threshold and only glyph
    /// normalization was applied.
    pub size_bypassed: bool,
}

impl SanitizeReport {
    /// Returns true if any stage changed the input.
    pub fn modified(&self) -> bool {
        self.glyphs_removed > 0
            || self.glyphs_folded > 0
            || self.backslashes_stripped > 0
            || self.duplicate_lines_dropped > 0
            || self.structural_duplicates_dropped > 0
            || self.headings_normalized > 0
            || self.bullets_normalized > 0
            || self.fences_closed > 0
            || self.inline_code_splits > 0
    }

    /// Total number of lines removed from the input.
    pub fn lines_dropped(&self) -> usize {
        self.duplicate_lines_dropped + self.structural_duplicates_dropped
    }

    /// Total number of lines added to the input.
    pub fn lines_inserted(&self) -> usize {
        self.fences_closed + self.inline_code_splits
    }
}

//! Pipeline orchestration.
//!
//! Composes the four stages (glyphs, dedup, structure, fences) in fixed
//! order, enforces the global size-bypass policy, guarantees the trailing
//! newline, and fronts the whole thing with the memoization cache.

use crate::cache::SanitizationCache;
use crate::options::SanitizeOptions;
use crate::report::SanitizeReport;
use crate::{dedup, fence, glyph, structure};
use std::path::Path;
use tracing::debug;

/// Inputs longer than this (in characters) skip everything except glyph
/// normalization. Full repair is O(lines) with possible O(insertions) output
/// growth, which is unacceptable at this scale on a UI thread path.
pub const SIZE_BYPASS_THRESHOLD: usize = 500_000;

type PostPass = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Sanitizes model-produced Markdown for a strict renderer.
///
/// Entry point owning the options and the memoization cache. Cheap to call
/// repeatedly with the same input: repeated invocations hit the cache and
/// skip the line-scanning stages entirely.
///
/// # Example
///
/// ```
/// use mdmend::Sanitizer;
///
/// let sanitizer = Sanitizer::new();
/// let output = sanitizer.sanitize("```python print(1)");
/// assert_eq!(output, "```python\nprint(1)\n```\n");
/// ```
pub struct Sanitizer {
    options: SanitizeOptions,
    cache: SanitizationCache,
    post_pass: Option<PostPass>,
}

impl Sanitizer {
    /// Creates a sanitizer with default options and cache capacity.
    pub fn new() -> Self {
        Self::with_options(SanitizeOptions::default())
    }

    /// Creates a sanitizer with the given options.
    pub fn with_options(options: SanitizeOptions) -> Self {
        Self {
            options,
            cache: SanitizationCache::new(),
            post_pass: None,
        }
    }

    /// Replaces the memoization cache (e.g. with a different capacity).
    pub fn with_cache(mut self, cache: SanitizationCache) -> Self {
        self.cache = cache;
        self
    }

    /// Installs a cosmetic rewrite applied after the core pipeline (and
    /// after cache retrieval), e.g. a CJK-bold compatibility pass. The
    /// post-pass is skipped on size-bypassed input, which receives no repair
    /// beyond glyph normalization.
    pub fn with_post_pass(
        mut self,
        pass: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.post_pass = Some(Box::new(pass));
        self
    }

    /// Sanitizes `text`, memoizing the result.
    pub fn sanitize(&self, text: &str) -> String {
        if exceeds_threshold(text) {
            debug!(
                threshold = SIZE_BYPASS_THRESHOLD,
                "input over size threshold, glyph normalization only"
            );
            return glyph::normalize_glyphs(text);
        }

        let options = self.options.clone();
        let output = self
            .cache
            .get_or_compute(text, |t| run_stages(t, &options, &mut SanitizeReport::default()));
        match &self.post_pass {
            Some(pass) => pass(&output),
            None => output,
        }
    }

    /// Sanitizes `text` and reports every repair applied. Bypasses the cache
    /// so the counters always reflect this invocation.
    pub fn sanitize_with_report(&self, text: &str) -> (String, SanitizeReport) {
        let (output, report) = sanitize_with_report(text, &self.options);
        let output = match &self.post_pass {
            Some(pass) if !report.size_bypassed => pass(&output),
            _ => output,
        };
        (output, report)
    }

    /// The memoization cache, e.g. for explicit clearing.
    pub fn cache(&self) -> &SanitizationCache {
        &self.cache
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot sanitization with default options and no cache.
///
/// For repeated invocation (scrolling lists, recomposition) use
/// [`Sanitizer`], which memoizes.
pub fn sanitize(text: &str) -> String {
    if exceeds_threshold(text) {
        debug!(
            threshold = SIZE_BYPASS_THRESHOLD,
            "input over size threshold, glyph normalization only"
        );
        return glyph::normalize_glyphs(text);
    }
    run_stages(text, &SanitizeOptions::default(), &mut SanitizeReport::default())
}

/// Sanitizes with explicit options, returning the repair report. Uncached.
pub fn sanitize_with_report(text: &str, options: &SanitizeOptions) -> (String, SanitizeReport) {
    let mut report = SanitizeReport::default();

    if exceeds_threshold(text) {
        report.size_bypassed = true;
        let output = if options.normalize_glyphs {
            glyph::normalize_glyphs_counted(text, &mut report)
        } else {
            text.to_string()
        };
        return (output, report);
    }

    let output = run_stages(text, options, &mut report);
    (output, report)
}

/// Reads a file and sanitizes its contents (one-shot, uncached).
pub fn sanitize_file(path: impl AsRef<Path>) -> crate::Result<String> {
    let text = std::fs::read_to_string(path)?;
    Ok(sanitize(&text))
}

/// Runs the enabled stages in fixed order and forces exactly one trailing
/// newline.
fn run_stages(text: &str, options: &SanitizeOptions, report: &mut SanitizeReport) -> String {
    let mut result = if options.normalize_glyphs {
        glyph::normalize_glyphs_counted(text, report)
    } else {
        text.to_string()
    };
    if options.dedup_lines {
        result = dedup::dedup_lines_counted(&result, report);
    }
    if options.normalize_structure {
        result = structure::normalize_structure_counted(&result, report);
    }
    if options.repair_fences {
        result = fence::repair_fences_counted(&result, report);
    }

    // Output contract: exactly one trailing newline.
    let trimmed_len = result.trim_end_matches('\n').len();
    result.truncate(trimmed_len);
    result.push('\n');
    result
}

/// Character-count threshold check with early exit, so huge inputs are not
/// fully counted just to decide the bypass.
fn exceeds_threshold(text: &str) -> bool {
    // A char is at least one byte; short byte strings cannot exceed the
    // character threshold.
    if text.len() <= SIZE_BYPASS_THRESHOLD {
        return false;
    }
    text.chars().take(SIZE_BYPASS_THRESHOLD + 1).count() > SIZE_BYPASS_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_input_gains_only_trailing_newline() {
        let input = "```python\nprint(1)\n```";
        assert_eq!(sanitize(input), "```python\nprint(1)\n```\n");
    }

    #[test]
    fn test_open_fence_with_inline_code() {
        assert_eq!(sanitize("```python print(1)"), "```python\nprint(1)\n```\n");
    }

    #[test]
    fn test_adjacent_duplicate_lines() {
        assert_eq!(sanitize("Hello\nHello\nWorld"), "Hello\nWorld\n");
    }

    #[test]
    fn test_fullwidth_heading_marker() {
        assert_eq!(sanitize("＃Title"), "# Title\n");
    }

    #[test]
    fn test_heading_after_unclosed_fence() {
        assert_eq!(
            sanitize("```\ncode line\n# Next Heading\nmore text"),
            "```\ncode line\n```\n# Next Heading\nmore text\n"
        );
    }

    #[test]
    fn test_marker_variant_duplicates_collapse() {
        // Pairs that only become identical after marker normalization must
        // still collapse to a single line in the output.
        assert_eq!(sanitize("## Title ##\n## Title"), "## Title\n");
        assert_eq!(sanitize("＃Title\n# Title"), "# Title\n");
        assert_eq!(sanitize("• item\n- item"), "- item\n");
    }

    #[test]
    fn test_exactly_one_trailing_newline() {
        assert_eq!(sanitize("text\n\n\n"), "text\n");
        assert_eq!(sanitize("text"), "text\n");
        assert_eq!(sanitize("text\n"), "text\n");
    }

    #[test]
    fn test_bypass_boundary() {
        // One character over: glyph normalization only, fence untouched.
        let prefix = "```\n\u{200B}";
        let prefix_chars = prefix.chars().count();
        let over = format!(
            "{}{}",
            prefix,
            "a".repeat(SIZE_BYPASS_THRESHOLD + 1 - prefix_chars)
        );
        let output = sanitize(&over);
        assert_eq!(output, glyph::normalize_glyphs(&over));
        assert!(output.starts_with("```\na"));
        assert!(!output.ends_with('\n'));

        // One character under: full pipeline applies.
        let under = format!("```\n{}", "a".repeat(SIZE_BYPASS_THRESHOLD - 1 - 4));
        let output = sanitize(&under);
        assert!(output.ends_with("```\n"));
    }

    #[test]
    fn test_bypass_reported() {
        let input = "x".repeat(SIZE_BYPASS_THRESHOLD + 1);
        let (_, report) = sanitize_with_report(&input, &SanitizeOptions::default());
        assert!(report.size_bypassed);
        assert!(!report.modified());
    }

    #[test]
    fn test_sanitizer_memoizes() {
        let sanitizer = Sanitizer::new();
        let first = sanitizer.sanitize("Hello\nHello");
        let second = sanitizer.sanitize("Hello\nHello");
        assert_eq!(first, second);
        assert_eq!(sanitizer.cache().len(), 1);
    }

    #[test]
    fn test_sanitizer_cache_clear() {
        let sanitizer = Sanitizer::new();
        sanitizer.sanitize("x");
        sanitizer.cache().clear();
        assert!(sanitizer.cache().is_empty());
    }

    #[test]
    fn test_post_pass_applied_after_pipeline() {
        let sanitizer = Sanitizer::new().with_post_pass(|s| s.replace("bold", "BOLD"));
        assert_eq!(sanitizer.sanitize("bold\nbold"), "BOLD\n");
    }

    #[test]
    fn test_minimal_options_skip_repair() {
        let (output, report) =
            sanitize_with_report("```python print(1)", &SanitizeOptions::minimal());
        assert_eq!(output, "```python print(1)\n");
        assert_eq!(report.fences_closed, 0);
    }

    #[test]
    fn test_report_counts_full_run() {
        let input = "＃Title\ntext\ntext\n```bash ls -la";
        let (output, report) = sanitize_with_report(input, &SanitizeOptions::default());
        assert_eq!(output, "# Title\ntext\n```bash\nls -la\n```\n");
        assert!(report.modified());
        assert_eq!(report.duplicate_lines_dropped, 1);
        assert_eq!(report.headings_normalized, 1);
        assert_eq!(report.inline_code_splits, 1);
        assert_eq!(report.fences_closed, 1);
    }

    #[test]
    fn test_sanitize_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "Hello\nHello\nWorld").expect("write temp file");
        let output = sanitize_file(file.path()).expect("sanitize file");
        assert_eq!(output, "Hello\nWorld\n");
    }

    #[test]
    fn test_sanitize_file_missing() {
        let result = sanitize_file("/nonexistent/mdmend-test-input.md");
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "```python print(1)",
            "Hello\nHello\nWorld",
            "＃Title\n\n```\ncode\n# Heading",
            "• a\n• a\n| x | y |\n## T ##",
            "## Title ##\n## Title",
            "＃Title\n# Title",
            "• item\n- item",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {input:?}");
        }
    }
}

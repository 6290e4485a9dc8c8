//! Line deduplication (stage 2 of the pipeline).
//!
//! Language models under sampling pressure repeat themselves: the same
//! paragraph twice in a row, the same heading re-emitted with different
//! spacing, stray line-continuation backslashes at line ends. This stage runs
//! three sequential sub-passes, each fence-aware so that code content is
//! never rewritten:
//!
//! 1. dangling trailing backslash removal;
//! 2. strictly adjacent verbatim duplicate collapse;
//! 3. adjacent structurally-equivalent heading/list collapse.

use crate::fence::{FenceTracker, LineClass};
use crate::report::SanitizeReport;
use crate::structure;
use regex::Regex;
use std::sync::LazyLock;

// Structural line prefixes: atx headings, unordered bullets, ordered items.
static RE_HEADING_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#{1,6}\s+").unwrap());

static RE_BULLET_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[*+-]\s+").unwrap());

static RE_ORDERED_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+[.)]\s+").unwrap());

/// Removes dangling backslashes and collapses adjacent duplicate lines.
///
/// Lines inside an open fence pass through untouched; fence delimiter lines
/// are never dropped and reset all adjacency memory.
pub fn dedup_lines(input: &str) -> String {
    dedup_lines_counted(input, &mut SanitizeReport::default())
}

pub(crate) fn dedup_lines_counted(input: &str, report: &mut SanitizeReport) -> String {
    let pass1 = strip_dangling_backslashes(input, report);
    let pass2 = collapse_adjacent_duplicates(&pass1, report);
    collapse_structural_duplicates(&pass2, report)
}

/// Sub-pass 1: a non-fenced line ending in whitespace plus a single
/// backslash has that suffix stripped.
fn strip_dangling_backslashes(input: &str, report: &mut SanitizeReport) -> String {
    let mut tracker = FenceTracker::default();
    let mut out: Vec<&str> = Vec::new();

    for line in input.split('\n') {
        if tracker.classify(line) != LineClass::Text {
            out.push(line);
            continue;
        }
        if let Some(stripped) = strip_trailing_backslash(line) {
            report.backslashes_stripped += 1;
            out.push(stripped);
        } else {
            out.push(line);
        }
    }

    out.join("\n")
}

/// Returns the line without its trailing `\s*\\` suffix, or `None` if the
/// line does not end in a single (non-escaped) backslash.
fn strip_trailing_backslash(line: &str) -> Option<&str> {
    if !line.ends_with('\\') || line.ends_with("\\\\") {
        return None;
    }
    Some(line[..line.len() - 1].trim_end())
}

/// Sub-pass 2: strictly adjacent non-blank lines that are identical, either
/// verbatim or in the form the structural stage will rewrite them to,
/// collapse to the first. A blank line resets the memory, so "A / blank / A"
/// is preserved.
///
/// Comparing canonical forms matters because this stage runs before the
/// structural rewrites: "＃Title" followed by "# Title" must collapse now,
/// or the rewrite would create an adjacent duplicate pair in the output.
fn collapse_adjacent_duplicates<'a>(input: &'a str, report: &mut SanitizeReport) -> String {
    let mut tracker = FenceTracker::default();
    let mut out: Vec<&str> = Vec::new();
    let mut last_seen: Option<(&'a str, String)> = None;

    for line in input.split('\n') {
        match tracker.classify(line) {
            LineClass::Delimiter => {
                last_seen = None;
                out.push(line);
                continue;
            }
            LineClass::Fenced => {
                out.push(line);
                continue;
            }
            LineClass::Text => {}
        }
        if line.trim().is_empty() {
            last_seen = None;
            out.push(line);
            continue;
        }
        let canonical = structure::canonical_line(line);
        if let Some((last_raw, last_canonical)) = &last_seen {
            if line == *last_raw {
                report.duplicate_lines_dropped += 1;
                continue;
            }
            if canonical == *last_canonical {
                report.structural_duplicates_dropped += 1;
                continue;
            }
        }
        last_seen = Some((line, canonical));
        out.push(line);
    }

    out.join("\n")
}

/// Sub-pass 3: adjacent heading/list lines with the same normalized content
/// collapse to the first. Non-structural lines and fence transitions reset
/// the memory.
fn collapse_structural_duplicates(input: &str, report: &mut SanitizeReport) -> String {
    let mut tracker = FenceTracker::default();
    let mut out: Vec<&str> = Vec::new();
    let mut last_key: Option<String> = None;

    for line in input.split('\n') {
        if tracker.classify(line) != LineClass::Text {
            last_key = None;
            out.push(line);
            continue;
        }
        match structural_key(line) {
            Some(key) => {
                if last_key.as_deref() == Some(key.as_str()) {
                    report.structural_duplicates_dropped += 1;
                    continue;
                }
                last_key = Some(key);
                out.push(line);
            }
            None => {
                last_key = None;
                out.push(line);
            }
        }
    }

    out.join("\n")
}

/// Computes the comparison key of a structural (heading or list) line: the
/// line in its post-rewrite canonical form, marker prefix stripped, internal
/// whitespace collapsed, lowercased. Used only for the single adjacent-line
/// comparison, never stored beyond it.
fn structural_key(line: &str) -> Option<String> {
    let canonical = structure::canonical_line(line);
    let trimmed = canonical.trim_start();
    let rest = RE_HEADING_PREFIX
        .find(trimmed)
        .or_else(|| RE_BULLET_PREFIX.find(trimmed))
        .or_else(|| RE_ORDERED_PREFIX.find(trimmed))
        .map(|m| &trimmed[m.end()..])?;
    Some(
        rest.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacent_duplicates_collapse() {
        assert_eq!(dedup_lines("Hello\nHello\nWorld"), "Hello\nWorld");
    }

    #[test]
    fn test_triple_repeat_collapses_to_one() {
        assert_eq!(dedup_lines("Hello\nHello\nHello"), "Hello");
    }

    #[test]
    fn test_blank_line_resets_memory() {
        let input = "A\n\nA";
        assert_eq!(dedup_lines(input), input);
    }

    #[test]
    fn test_fenced_duplicates_preserved() {
        let input = "```\nx = 1\nx = 1\n```";
        assert_eq!(dedup_lines(input), input);
    }

    #[test]
    fn test_fence_delimiters_never_dropped() {
        // Adjacent identical delimiter lines are an empty code block, not a
        // duplicate paragraph.
        let input = "```\n```";
        assert_eq!(dedup_lines(input), input);
    }

    #[test]
    fn test_dangling_backslash_stripped() {
        assert_eq!(dedup_lines("line one \\\nline two"), "line one\nline two");
    }

    #[test]
    fn test_escaped_backslash_kept() {
        let input = "ends with literal \\\\";
        assert_eq!(dedup_lines(input), input);
    }

    #[test]
    fn test_backslash_inside_fence_kept() {
        let input = "```\ncmd --flag \\\n  --more\n```";
        assert_eq!(dedup_lines(input), input);
    }

    #[test]
    fn test_marker_variants_collapse_before_rewrite() {
        // These pairs only become identical once the structural stage has
        // rewritten their markers; the canonical comparison collapses them
        // here so the rewrite cannot create adjacent duplicates.
        assert_eq!(dedup_lines("## Title ##\n## Title"), "## Title ##");
        assert_eq!(dedup_lines("＃Title\n# Title"), "＃Title");
        assert_eq!(dedup_lines("• item\n- item"), "• item");
    }

    #[test]
    fn test_structural_dedup_case_insensitive() {
        assert_eq!(dedup_lines("# Intro\n#  intro"), "# Intro");
    }

    #[test]
    fn test_structural_dedup_whitespace_collapsed() {
        assert_eq!(
            dedup_lines("- first   item\n- first item"),
            "- first   item"
        );
    }

    #[test]
    fn test_structural_dedup_ordered_lists() {
        assert_eq!(dedup_lines("1. step one\n1) Step  One"), "1. step one");
    }

    #[test]
    fn test_prose_between_structural_lines_resets() {
        let input = "# Title\nsome prose\n# Title";
        assert_eq!(dedup_lines(input), input);
    }

    #[test]
    fn test_distinct_structural_lines_kept() {
        let input = "# One\n# Two\n- a\n- b";
        assert_eq!(dedup_lines(input), input);
    }

    #[test]
    fn test_structural_key_extraction() {
        assert_eq!(structural_key("## My  Title"), Some("my title".to_string()));
        assert_eq!(structural_key("## Closed ##"), Some("closed".to_string()));
        assert_eq!(structural_key("* item"), Some("item".to_string()));
        assert_eq!(structural_key("• item"), Some("item".to_string()));
        assert_eq!(structural_key("3) item"), Some("item".to_string()));
        assert_eq!(structural_key("plain prose"), None);
        assert_eq!(structural_key("####### too deep"), None);
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "Hello\nHello\nWorld",
            "# T\n# t\nbody \\",
            "```\na\na\n```\nb\nb",
        ];
        for input in inputs {
            let once = dedup_lines(input);
            assert_eq!(dedup_lines(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_counts_reported() {
        let mut report = SanitizeReport::default();
        dedup_lines_counted("x \\\na\na\n# h\n# H", &mut report);
        assert_eq!(report.backslashes_stripped, 1);
        assert_eq!(report.duplicate_lines_dropped, 1);
        assert_eq!(report.structural_duplicates_dropped, 1);
    }
}

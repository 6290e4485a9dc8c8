//! Structural normalization (stage 3 of the pipeline).
//!
//! Repairs heading and list markers that strict Markdown parsers refuse to
//! recognize: full-width `＃`, over-indented atx headings, duplicated `#`
//! runs inside the heading text, stray closing `#` runs, and exotic bullet
//! glyphs. All rewrites are suppressed inside open fences and inside tables,
//! with both states tracked per line so they stay correct even when no
//! rewrite happens.
//!
//! Table detection is deliberately heuristic (a line with two or more pipes
//! is a table row) and must stay that way: real table-grammar detection would
//! over-correct and break the fence/table interaction the rest of the
//! pipeline depends on.

use crate::fence::{FenceTracker, LineClass};
use crate::glyph::is_invisible;
use crate::report::SanitizeReport;

/// Heuristic table state: entered on table-looking rows, exited on a blank
/// line or a non-pipe-prefixed non-row line. Used only to suppress rewrites.
#[derive(Debug, Default)]
struct TableState {
    in_table: bool,
}

/// A table row: at least two pipe characters anywhere in the line.
fn is_table_row(line: &str) -> bool {
    line.chars().filter(|&c| c == '|').count() >= 2
}

/// A separator row: non-empty trimmed content of only `|`, `-`, `:`, space.
fn is_table_separator(trimmed: &str) -> bool {
    !trimmed.is_empty() && trimmed.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

/// Normalizes heading and list markers outside fences and tables.
pub fn normalize_structure(input: &str) -> String {
    normalize_structure_counted(input, &mut SanitizeReport::default())
}

pub(crate) fn normalize_structure_counted(input: &str, report: &mut SanitizeReport) -> String {
    let mut fence = FenceTracker::default();
    let mut table = TableState::default();
    let mut out: Vec<String> = Vec::new();

    for line in input.split('\n') {
        match fence.classify(line) {
            LineClass::Delimiter => {
                table.in_table = false;
                out.push(line.to_string());
                continue;
            }
            LineClass::Fenced => {
                out.push(line.to_string());
                continue;
            }
            LineClass::Text => {}
        }

        // Table detection precedes every rewrite.
        let trimmed = line.trim();
        if trimmed.is_empty() {
            table.in_table = false;
            out.push(line.to_string());
            continue;
        }
        if is_table_row(line) || is_table_separator(trimmed) {
            table.in_table = true;
            out.push(line.to_string());
            continue;
        }
        if table.in_table {
            if line.trim_start().starts_with('|') {
                out.push(line.to_string());
                continue;
            }
            // A non-pipe-prefixed non-row line leaves the table and is
            // eligible for rewriting itself.
            table.in_table = false;
        }

        out.push(rewrite_line(line, report));
    }

    out.join("\n")
}

/// The form an eligible line takes after every marker rewrite.
///
/// Used by the dedup stage to compare lines the way they will read once this
/// stage has run, so "## Title ##" and "## Title" collapse as duplicates
/// even though dedup executes first. Table suppression does not apply here;
/// two lines equal under this form are rewritten identically either way.
pub(crate) fn canonical_line(line: &str) -> String {
    rewrite_line(line, &mut SanitizeReport::default())
}

/// Applies the per-line marker rewrites to an eligible line.
fn rewrite_line(line: &str, report: &mut SanitizeReport) -> String {
    let mut current: String = line.replace('＃', "#");

    // Over-indented atx headings (4+ leading spaces) are code blocks to a
    // strict parser; pull them back to column zero.
    let stripped = current.trim_start();
    if current.len() - stripped.len() >= 4 && stripped.starts_with('#') {
        current = stripped.to_string();
    }

    // Invisible marks before the marker defeat prefix detection. The glyph
    // pass removes these globally, but this stage is also callable on its
    // own.
    let visible = current.trim_start_matches(is_invisible);
    if visible.len() != current.len() {
        current = visible.to_string();
    }

    if current.starts_with('#') {
        let rewritten = rewrite_heading(&current);
        if rewritten != line {
            report.headings_normalized += 1;
        }
        return rewritten;
    }

    if let Some(rewritten) = rewrite_bullet(&current) {
        report.bullets_normalized += 1;
        return rewritten;
    }

    current
}

/// Rewrites an atx heading line: marker captured, erroneous repeated `#`
/// runs stripped from the remainder, stray closing `#` run dropped, marker
/// and text re-joined with a single space.
fn rewrite_heading(line: &str) -> String {
    let marker_len = line.chars().take_while(|&c| c == '#').count();
    if marker_len > 6 {
        // Not a valid heading marker; leave it alone.
        return line.to_string();
    }

    let mut rest = line[marker_len..].trim_start();

    // Strip repeated erroneous marker runs: "### ## Title" -> "### Title".
    loop {
        let stripped = rest.trim_start_matches('#');
        if stripped.len() == rest.len() {
            break;
        }
        rest = stripped.trim_start();
    }

    // Strip a trailing closing run only when text precedes it, so a heading
    // that is nothing but `#` survives.
    let end_trimmed = rest.trim_end();
    if end_trimmed.ends_with('#') {
        let without = end_trimmed.trim_end_matches('#').trim_end();
        if !without.is_empty() {
            rest = without;
        }
    } else {
        rest = end_trimmed;
    }

    let marker = &line[..marker_len];
    if rest.is_empty() {
        marker.to_string()
    } else {
        format!("{marker} {rest}")
    }
}

/// Converts a leading `•` or `●` bullet (followed by a space) to `- `,
/// preserving indentation. Returns `None` when the line is not a bullet.
fn rewrite_bullet(line: &str) -> Option<String> {
    let indent_len = line.len() - line.trim_start().len();
    let rest = &line[indent_len..];
    let body = rest
        .strip_prefix("• ")
        .or_else(|| rest.strip_prefix("● "))?;
    Some(format!("{}- {}", &line[..indent_len], body))
}

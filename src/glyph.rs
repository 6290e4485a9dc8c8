//! Glyph normalization (stage 1 of the pipeline).
//!
//! Model output routinely carries invisible Unicode that breaks line-oriented
//! Markdown detection downstream: zero-width spaces in front of `#` markers,
//! bidi controls leaking from training data, ideographic spaces that defeat
//! list-indentation rules. This stage folds all of that to plain ASCII.
//!
//! The pass is a total, idempotent function with no fence awareness by
//! design: every substitution here is safe inside code blocks too (removing a
//! zero-width space from code never changes its meaning to a renderer).
//! Rewrites that would corrupt code content (bullet markers, heading fixes)
//! live in the fence-aware [`crate::structure`] stage instead.

use crate::report::SanitizeReport;
use unicode_normalization::UnicodeNormalization;

/// Invisible and bidi-control code points that are removed outright.
///
/// Fixed table: zero-width spaces/joiners and direction marks (U+200B..200F),
/// bidi embeddings and overrides (U+202A..202E), invisible operators and the
/// word joiner (U+2060..2064), bidi isolates (U+2066..2069), BOM, soft
/// hyphen, and the Mongolian vowel separator.
pub(crate) fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{2069}'
            | '\u{FEFF}'
            | '\u{00AD}'
            | '\u{180E}'
    )
}

/// Exotic Unicode space code points folded to U+0020.
fn is_exotic_space(c: char) -> bool {
    matches!(
        c,
        '\u{00A0}' | '\u{1680}' | '\u{2000}'..='\u{200A}' | '\u{202F}' | '\u{205F}' | '\u{3000}'
    )
}

/// Full-width and small asterisk variants folded to ASCII `*`.
fn is_asterisk_variant(c: char) -> bool {
    matches!(c, '\u{FF0A}' | '\u{FE61}')
}

/// Normalizes glyphs in the input text.
///
/// Strips invisible/bidi-control code points, folds exotic spaces and
/// asterisk variants to ASCII, expands tabs to two spaces, and applies
/// Unicode NFC to the result. Total function with no failure modes;
/// `normalize_glyphs(normalize_glyphs(x)) == normalize_glyphs(x)`.
pub fn normalize_glyphs(input: &str) -> String {
    normalize_glyphs_counted(input, &mut SanitizeReport::default())
}

pub(crate) fn normalize_glyphs_counted(input: &str, report: &mut SanitizeReport) -> String {
    let mut result = String::with_capacity(input.len());

    // Invisibles are removed before NFC runs: stripping a joiner between a
    // base char and a combining mark exposes a pair that must still compose
    // on this call, not the next one.
    for c in input.chars() {
        if is_invisible(c) {
            report.glyphs_removed += 1;
            continue;
        }
        if is_exotic_space(c) {
            report.glyphs_folded += 1;
            result.push(' ');
            continue;
        }
        if is_asterisk_variant(c) {
            report.glyphs_folded += 1;
            result.push('*');
            continue;
        }
        if c == '\t' {
            report.glyphs_folded += 1;
            result.push_str("  ");
            continue;
        }
        result.push(c);
    }

    result.nfc().collect()
}

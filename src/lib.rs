//! # mdmend
//!
//! A line-oriented sanitization and repair pipeline for Markdown streamed
//! from language models.
//!
//! Model output is untrusted, often syntactically broken, and frequently
//! partial: unbalanced code fences, inline code jammed onto the opening
//! fence line, duplicated paragraphs from sampling loops, invisible Unicode
//! that breaks heading and list detection. mdmend repairs those structural
//! defects without a full Markdown parse, so the result is safe to hand to
//! a standards-compliant renderer. Repair cost stays bounded in time and
//! memory because it runs on UI-thread paths.
//!
//! ## Pipeline stages
//!
//! 1. **Glyph normalization**: strips invisible/bidi code points, folds
//!    exotic whitespace and width variants to ASCII.
//! 2. **Line dedup**: removes dangling backslashes, collapses adjacent
//!    duplicate and structurally-equivalent lines.
//! 3. **Structural normalization**: fixes heading/list markers, fence- and
//!    table-aware.
//! 4. **Fence repair**: the state machine that splits inline code off
//!    opening fences and closes every fence the model forgot to close.
//!
//! ## Quick start
//!
//! ```
//! use mdmend::Sanitizer;
//!
//! let sanitizer = Sanitizer::new();
//! let output = sanitizer.sanitize("```\ncode\n# The model moved on");
//! assert_eq!(output, "```\ncode\n```\n# The model moved on\n");
//! ```
//!
//! Repeated calls with identical input are served from a bounded LRU cache,
//! so invoking the sanitizer on every list recomposition is cheap. For a
//! one-shot call without memoization use [`sanitize`].

pub mod cache;
pub mod dedup;
pub mod error;
pub mod fence;
pub mod glyph;
pub mod options;
pub mod pipeline;
pub mod report;
pub mod structure;

// Re-exports
pub use cache::{SanitizationCache, DEFAULT_CACHE_CAPACITY};
pub use dedup::dedup_lines;
pub use error::{Error, Result};
pub use fence::{repair_fences, MAX_SYNTHETIC_CLOSES};
pub use glyph::normalize_glyphs;
pub use options::SanitizeOptions;
pub use pipeline::{
    sanitize, sanitize_file, sanitize_with_report, Sanitizer, SIZE_BYPASS_THRESHOLD,
};
pub use report::SanitizeReport;
pub use structure::normalize_structure;

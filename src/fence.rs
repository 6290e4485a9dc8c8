//! Fenced-code-block repair (stage 4, the core state machine).
//!
//! Model output frequently opens a code fence and never closes it, or jams
//! the first line of code onto the opening fence line (`` ```python print(1)
//! ``). Without repair, everything after an unterminated fence renders as one
//! giant code block. This stage walks the document line by line with two
//! states, `Text` and `InFence`, and:
//!
//! - splits inline code off the opening fence line onto its own line;
//! - force-closes a fence when a structural boundary (heading, list item,
//!   horizontal rule, recognized prose marker) or two consecutive blank lines
//!   strongly imply the model has moved past code context;
//! - closes any fence still open at end of input.
//!
//! Fence-delimiter scanning is explicit char scanning; regex is reserved for
//! the cold structural-boundary classification, matching the rest of the
//! crate.

use crate::report::SanitizeReport;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// Upper bound on synthetic closing-fence lines inserted per invocation.
///
/// Converts pathological input (thousands of re-opened fences) into bounded,
/// partially repaired output instead of unbounded growth.
pub const MAX_SYNTHETIC_CLOSES: usize = 200;

/// An open fence context: the delimiter character and the length of its
/// opening run. A closing run must use the same character and be at least as
/// long. At most one fence context is ever open (no nesting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fence {
    pub delimiter: char,
    pub len: usize,
}

impl Fence {
    /// The canonical delimiter line for this fence.
    fn delimiter_line(&self) -> String {
        self.delimiter.to_string().repeat(self.len)
    }
}

/// Parses a fence-delimiter run at the start of a (left-trimmed) line.
///
/// Returns the fence and the remainder of the line after the run, or `None`
/// if the line does not begin with at least three identical backticks or
/// tildes.
pub(crate) fn fence_run(line: &str) -> Option<(Fence, &str)> {
    let trimmed = line.trim_start();
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }
    let run = trimmed.chars().take_while(|&c| c == first).count();
    if run < 3 {
        return None;
    }
    // Backtick and tilde are single-byte, so `run` is a valid byte offset.
    Some((
        Fence {
            delimiter: first,
            len: run,
        },
        &trimmed[run..],
    ))
}

/// Returns true if `line` explicitly closes `open`: a leading run of the open
/// delimiter character at least as long as the opening run, with nothing but
/// whitespace after it.
pub(crate) fn closes(line: &str, open: Fence) -> bool {
    let trimmed = line.trim();
    let run = trimmed.chars().take_while(|&c| c == open.delimiter).count();
    run >= open.len && trimmed[run..].trim().is_empty()
}

/// How one physical line relates to fence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineClass {
    /// An opening or closing fence delimiter line.
    Delimiter,
    /// Content inside an open fence.
    Fenced,
    /// Ordinary text outside any fence.
    Text,
}

/// Fence-state tracker shared by the dedup and structural stages, which must
/// never rewrite content inside an open fence.
///
/// Classification mirrors the repair state machine exactly, including the
/// early-close heuristics: a line the repairer will force a close in front
/// of is already `Text` here. Earlier stages therefore agree with the final
/// fence structure, which is what makes the whole pipeline idempotent.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    open: Option<Fence>,
    blank_streak: usize,
}

impl FenceTracker {
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Updates state for one physical line and classifies it.
    pub fn classify(&mut self, line: &str) -> LineClass {
        match self.open {
            Some(fence) => {
                if closes(line, fence) {
                    self.open = None;
                    self.blank_streak = 0;
                    LineClass::Delimiter
                } else if is_structural_boundary(line) || self.blank_streak >= 2 {
                    // The repairer will close the fence before this line.
                    self.open = None;
                    self.blank_streak = 0;
                    self.classify_outside(line)
                } else {
                    if line.trim().is_empty() {
                        self.blank_streak += 1;
                    } else {
                        self.blank_streak = 0;
                    }
                    LineClass::Fenced
                }
            }
            None => self.classify_outside(line),
        }
    }

    fn classify_outside(&mut self, line: &str) -> LineClass {
        if let Some((fence, _)) = fence_run(line) {
            self.open = Some(fence);
            self.blank_streak = 0;
            LineClass::Delimiter
        } else {
            LineClass::Text
        }
    }
}

// Cold-path classification of lines that imply the model has left code
// context. The keyword list is configuration data distilled from observed
// model behavior, not a grammar.
static RE_LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[*+-]|\d+[.)])\s+").unwrap());

static RE_DASH_RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-{3,}\s*$").unwrap());

const BOUNDARY_MARKERS: &[&str] = &["Commands:", "Command:", "Step", "命令", "指令", "步骤"];

/// Returns true if the line is a structural boundary that justifies
/// force-closing an open fence before it.
fn is_structural_boundary(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with('#')
        || RE_LIST_ITEM.is_match(line)
        || RE_DASH_RULE.is_match(line.trim())
        || BOUNDARY_MARKERS.iter().any(|m| trimmed.starts_with(m))
}

/// Repairs fenced code blocks in the input.
///
/// Splits inline code off opening fence lines, force-closes fences at
/// structural boundaries, and closes any fence left open at end of input.
/// The output never contains a dangling open fence.
pub fn repair_fences(input: &str) -> String {
    repair_fences_counted(input, &mut SanitizeReport::default())
}

pub(crate) fn repair_fences_counted(input: &str, report: &mut SanitizeReport) -> String {
    let mut lines: Vec<String> = input.split('\n').map(str::to_owned).collect();
    let mut state: Option<Fence> = None;
    let mut inserted = 0usize;
    let mut blank_streak = 0usize;
    let mut budget_warned = false;

    // Explicit cursor over a growable line buffer: repairs insert lines at
    // the cursor and the displaced line is reprocessed in `Text` state.
    let mut i = 0;
    while i < lines.len() {
        match state {
            None => {
                if let Some((fence, after_run)) = fence_run(&lines[i]) {
                    // Owned copies before the buffer is mutated below.
                    let mut parts = after_run.trim().splitn(2, char::is_whitespace);
                    let lang = parts.next().unwrap_or("").to_string();
                    let rest = parts.next().unwrap_or("").trim().to_string();

                    // Normalized opener carries only the delimiter and the
                    // language token.
                    lines[i] = format!("{}{}", fence.delimiter_line(), lang);
                    if !rest.is_empty() {
                        // The classic ```lang inline_code defect: the code
                        // belongs on its own line inside the fence.
                        lines.insert(i + 1, rest);
                        report.inline_code_splits += 1;
                    }
                    state = Some(fence);
                    blank_streak = 0;
                }
                i += 1;
            }
            Some(fence) => {
                let line = &lines[i];
                if closes(line, fence) {
                    state = None;
                    blank_streak = 0;
                    i += 1;
                } else if is_structural_boundary(line) || blank_streak >= 2 {
                    if inserted >= MAX_SYNTHETIC_CLOSES {
                        // Defensive stop: abandon the fence without another
                        // insertion and keep scanning from this line.
                        state = None;
                        report.insertion_budget_exhausted = true;
                        if !budget_warned {
                            warn!(
                                cap = MAX_SYNTHETIC_CLOSES,
                                "fence repair insertion budget exhausted"
                            );
                            budget_warned = true;
                        }
                    } else {
                        lines.insert(i, fence.delimiter_line());
                        inserted += 1;
                        report.fences_closed += 1;
                        state = None;
                        blank_streak = 0;
                        // Skip the inserted close; the displaced line is
                        // reprocessed in `Text` state.
                        i += 1;
                    }
                } else {
                    if line.trim().is_empty() {
                        blank_streak += 1;
                    } else {
                        blank_streak = 0;
                    }
                    i += 1;
                }
            }
        }
    }

    // Terminal repair: a fence still open at end of input gets one close.
    if let Some(fence) = state {
        lines.push(fence.delimiter_line());
        report.fences_closed += 1;
    }

    lines.join("\n")
}

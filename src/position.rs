//! Indentation inference and insertion-point calculation.
//!
//! Insertion is line-granular: inserted content always becomes whole new
//! lines placed before an anchor line, after the last line of a match, or at
//! the end of the file.

use crate::text::LineIndex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::PathBuf;

const DEFAULT_INDENT_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentStyle {
    #[default]
    Spaces,
    Tabs,
}

/// The indentation step a file uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndentUnit {
    pub style: IndentStyle,
    /// Columns per level. Also the column width assumed for a tab.
    pub width: usize,
}

impl Default for IndentUnit {
    fn default() -> Self {
        Self {
            style: IndentStyle::Spaces,
            width: DEFAULT_INDENT_WIDTH,
        }
    }
}

impl IndentUnit {
    /// Visual width of a run of leading whitespace.
    pub fn columns(&self, whitespace: &str) -> usize {
        whitespace
            .chars()
            .map(|c| if c == '\t' { self.width } else { 1 })
            .sum()
    }

    /// Render `columns` of indentation in this unit's style.
    pub fn render(&self, columns: usize) -> String {
        match self.style {
            IndentStyle::Spaces => " ".repeat(columns),
            IndentStyle::Tabs => {
                let width = self.width.max(1);
                let mut out = "\t".repeat(columns / width);
                out.push_str(&" ".repeat(columns % width));
                out
            }
        }
    }
}

/// Leading whitespace of one line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Indent {
    /// The whitespace exactly as it appears in the file.
    pub text: String,
    /// Number of whitespace characters.
    pub count: usize,
    pub style: IndentStyle,
}

impl Indent {
    pub fn none() -> Self {
        Self::default()
    }
}

pub fn leading_whitespace(line: &str) -> &str {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

pub fn indentation_of(line: &str) -> Indent {
    let ws = leading_whitespace(line);
    let style = if ws.starts_with('\t') {
        IndentStyle::Tabs
    } else {
        IndentStyle::Spaces
    };
    Indent {
        text: ws.to_string(),
        count: ws.chars().count(),
        style,
    }
}

/// Infer the indentation unit of `content`.
///
/// Tabs win when more indented lines start with a tab than with a space.
/// For spaces the width is the greatest common divisor of the observed
/// indents; without evidence the unit is four spaces.
pub fn suggest_indentation(content: &str) -> IndentUnit {
    let mut tab_lines = 0usize;
    let mut space_lines = 0usize;
    let mut width = 0usize;

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let ws = leading_whitespace(line);
        if ws.starts_with('\t') {
            tab_lines += 1;
        } else if !ws.is_empty() {
            space_lines += 1;
            width = gcd(width, ws.len());
        }
    }

    if tab_lines > space_lines {
        return IndentUnit {
            style: IndentStyle::Tabs,
            width: DEFAULT_INDENT_WIDTH,
        };
    }

    let width = if (2..=8).contains(&width) {
        width
    } else {
        DEFAULT_INDENT_WIDTH
    };
    IndentUnit {
        style: IndentStyle::Spaces,
        width,
    }
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Before,
    After,
    Replace,
    Append,
}

/// Where and how inserted content lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertionContext {
    pub target: PathBuf,
    pub base_indentation: usize,
    pub style: IndentStyle,
    /// Exact leading whitespace copied onto inserted lines.
    pub base: String,
    pub unit: IndentUnit,
    /// Line the content is inserted at (0-indexed). May equal the line
    /// count, meaning end of file.
    pub anchor_line: usize,
    pub direction: Direction,
}

impl InsertionContext {
    /// Build the context for inserting relative to `span` in `text`.
    ///
    /// Before/After take their indentation from the first matched line;
    /// Append inserts at column zero.
    pub fn new(
        target: impl Into<PathBuf>,
        text: &str,
        index: &LineIndex,
        span: Option<&Range<usize>>,
        direction: Direction,
    ) -> Self {
        let unit = suggest_indentation(text);
        let (anchor_line, indent) = match (direction, span) {
            (Direction::Append, _) | (_, None) => (calculate_append_position(index), Indent::none()),
            (Direction::Before, Some(span)) => {
                let line = calculate_before_position(index, span);
                (line, indentation_of(index.line_text(text, line)))
            }
            (Direction::After, Some(span)) => {
                let first = index.line_of(span.start);
                (
                    calculate_after_position(index, span),
                    indentation_of(index.line_text(text, first)),
                )
            }
            (Direction::Replace, Some(span)) => {
                let line = index.line_of(span.start);
                (line, indentation_of(index.line_text(text, line)))
            }
        };

        Self {
            target: target.into(),
            base_indentation: indent.count,
            style: indent.style,
            base: indent.text,
            unit,
            anchor_line,
            direction,
        }
    }

    pub fn indent(&self) -> Indent {
        Indent {
            text: self.base.clone(),
            count: self.base_indentation,
            style: self.style,
        }
    }
}

/// Line index new content is inserted at when placed before the match.
pub fn calculate_before_position(index: &LineIndex, span: &Range<usize>) -> usize {
    index.line_of(span.start)
}

/// Line index just past the last line touched by the match.
pub fn calculate_after_position(index: &LineIndex, span: &Range<usize>) -> usize {
    let last = if span.end > span.start {
        span.end - 1
    } else {
        span.start
    };
    (index.line_of(last) + 1).min(index.len())
}

pub fn calculate_append_position(index: &LineIndex) -> usize {
    index.len()
}

/// Byte offset for inserting whole lines at `line`, and whether a line
/// break must precede the inserted content (the previous line lacks one).
pub fn insertion_offset(text: &str, index: &LineIndex, line: usize) -> (usize, bool) {
    match index.get(line) {
        Some(span) => (span.start, false),
        None => {
            let needs_break = index.spans().last().is_some_and(|last| !last.has_terminator());
            (text.len(), needs_break)
        }
    }
}

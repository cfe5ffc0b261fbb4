use serde::{Deserialize, Serialize};
use std::fmt;

/// Line ending convention of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// Unix: `\n`
    #[default]
    Lf,
    /// Windows: `\r\n`
    Crlf,
    /// Classic Mac: `\r`
    Cr,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
            LineEnding::Cr => "\r",
        }
    }

    /// Detect the predominant line ending. Files without any line break
    /// report `Lf`.
    pub fn detect(text: &str) -> Self {
        LineEndingStats::scan(text).dominant()
    }

    /// Rewrite every line break in `text` to this convention.
    pub fn apply(&self, text: &str) -> String {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        match self {
            LineEnding::Lf => normalized,
            LineEnding::Crlf => normalized.replace('\n', "\r\n"),
            LineEnding::Cr => normalized.replace('\n', "\r"),
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineEnding::Lf => write!(f, "LF"),
            LineEnding::Crlf => write!(f, "CRLF"),
            LineEnding::Cr => write!(f, "CR"),
        }
    }
}

/// Line ending distribution of a text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineEndingStats {
    pub lf: usize,
    pub crlf: usize,
    pub cr: usize,
}

impl LineEndingStats {
    pub fn scan(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut stats = Self::default();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    stats.crlf += 1;
                    i += 2;
                    continue;
                }
                b'\r' => stats.cr += 1,
                b'\n' => stats.lf += 1,
                _ => {}
            }
            i += 1;
        }
        stats
    }

    /// Majority wins; ties prefer LF, then CRLF.
    pub fn dominant(&self) -> LineEnding {
        if self.lf >= self.crlf && self.lf >= self.cr {
            LineEnding::Lf
        } else if self.crlf >= self.cr {
            LineEnding::Crlf
        } else {
            LineEnding::Cr
        }
    }

    pub fn is_mixed(&self) -> bool {
        [self.lf, self.crlf, self.cr].iter().filter(|&&n| n > 0).count() > 1
    }
}

/// A location in a text. All fields are 0-indexed; `Display` renders the
/// 1-indexed `line:column` form used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    /// Column in characters from the start of the line.
    pub column: usize,
    /// Byte offset from the start of the text.
    pub offset: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Byte boundaries of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    /// End of the line content, excluding the terminator.
    pub content_end: usize,
    /// End of the line including its terminator.
    pub end: usize,
}

impl LineSpan {
    pub fn has_terminator(&self) -> bool {
        self.end > self.content_end
    }
}

/// Index of line boundaries. Recognizes `\n`, `\r\n` and lone `\r`, so the
/// spans are exact byte ranges of the original text.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    spans: Vec<LineSpan>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut spans = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < bytes.len() {
            let terminator = match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => 2,
                b'\r' | b'\n' => 1,
                _ => {
                    i += 1;
                    continue;
                }
            };
            spans.push(LineSpan {
                start,
                content_end: i,
                end: i + terminator,
            });
            i += terminator;
            start = i;
        }

        if start < bytes.len() {
            spans.push(LineSpan {
                start,
                content_end: bytes.len(),
                end: bytes.len(),
            });
        }

        Self { spans }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn get(&self, line: usize) -> Option<LineSpan> {
        self.spans.get(line).copied()
    }

    pub fn spans(&self) -> &[LineSpan] {
        &self.spans
    }

    /// Line content without its terminator.
    pub fn line_text<'a>(&self, text: &'a str, line: usize) -> &'a str {
        self.spans
            .get(line)
            .and_then(|span| text.get(span.start..span.content_end))
            .unwrap_or("")
    }

    /// Index of the line containing `offset`. Offsets at or past the end map
    /// to the last line.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.spans.binary_search_by(|span| {
            if offset < span.start {
                std::cmp::Ordering::Greater
            } else if offset >= span.end {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        }) {
            Ok(line) => line,
            Err(insert_at) => insert_at.saturating_sub(1),
        }
    }

    pub fn position(&self, text: &str, offset: usize) -> Position {
        let line = self.line_of(offset);
        let line_start = self.spans.get(line).map(|s| s.start).unwrap_or(0);
        let column = text
            .get(line_start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(0);
        Position {
            line,
            column,
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_dominant_line_ending() {
        assert_eq!(LineEnding::detect("a\nb\n"), LineEnding::Lf);
        assert_eq!(LineEnding::detect("a\r\nb\r\n"), LineEnding::Crlf);
        assert_eq!(LineEnding::detect("a\rb\r"), LineEnding::Cr);
        assert_eq!(LineEnding::detect("no breaks"), LineEnding::Lf);
    }

    #[test]
    fn mixed_line_endings_are_reported() {
        let stats = LineEndingStats::scan("a\r\nb\nc\r\n");
        assert!(stats.is_mixed());
        assert_eq!(stats.dominant(), LineEnding::Crlf);
    }

    #[test]
    fn apply_converts_all_breaks() {
        assert_eq!(LineEnding::Crlf.apply("a\nb\rc\r\n"), "a\r\nb\r\nc\r\n");
        assert_eq!(LineEnding::Lf.apply("a\r\nb"), "a\nb");
    }

    #[test]
    fn line_index_spans() {
        let text = "ab\r\ncd\nef";
        let index = LineIndex::new(text);
        assert_eq!(index.len(), 3);
        assert_eq!(index.line_text(text, 0), "ab");
        assert_eq!(index.line_text(text, 1), "cd");
        assert_eq!(index.line_text(text, 2), "ef");
        assert!(index.get(0).unwrap().has_terminator());
        assert!(!index.get(2).unwrap().has_terminator());
    }

    #[test]
    fn trailing_newline_does_not_add_a_line() {
        assert_eq!(LineIndex::new("a\nb\n").len(), 2);
        assert!(LineIndex::new("").is_empty());
    }

    #[test]
    fn position_is_one_indexed_for_display() {
        let text = "first\nsecond line";
        let index = LineIndex::new(text);
        let pos = index.position(text, 13);
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, 7);
        assert_eq!(pos.to_string(), "2:8");
    }
}

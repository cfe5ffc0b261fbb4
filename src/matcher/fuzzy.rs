//! Whitespace-insensitive matching.
//!
//! Both the pattern and each candidate line are normalized: leading and
//! trailing whitespace is stripped, runs of spaces/tabs collapse to one space
//! and blank lines are dropped. Spans are mapped back to the original bytes.

use crate::matcher::errors::MatchError;
use crate::text::LineIndex;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMatcher {
    /// ASCII case folding when false.
    pub case_sensitive: bool,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self {
            case_sensitive: true,
        }
    }
}

/// A normalized line with a byte map back to the original line.
struct NormalizedLine {
    text: String,
    /// `origin[i]` is the byte offset in the original line of normalized byte `i`.
    origin: Vec<usize>,
}

impl NormalizedLine {
    fn new(line: &str, case_sensitive: bool) -> Self {
        let mut text = String::with_capacity(line.len());
        let mut origin = Vec::with_capacity(line.len());
        let mut pending_space: Option<usize> = None;

        for (offset, ch) in line.char_indices() {
            if ch == ' ' || ch == '\t' {
                if !text.is_empty() && pending_space.is_none() {
                    pending_space = Some(offset);
                }
                continue;
            }
            if let Some(space_at) = pending_space.take() {
                text.push(' ');
                origin.push(space_at);
            }
            let ch = if case_sensitive {
                ch
            } else {
                ch.to_ascii_lowercase()
            };
            let start = text.len();
            text.push(ch);
            origin.extend((0..text.len() - start).map(|i| offset + i));
        }

        Self { text, origin }
    }

    /// Original byte range covered by normalized range `span`.
    fn original_range(&self, span: Range<usize>) -> Range<usize> {
        let start = self.origin[span.start];
        let end = self.origin[span.end - 1] + 1;
        start..end
    }

    fn content_range(&self) -> Range<usize> {
        if self.text.is_empty() {
            0..0
        } else {
            self.original_range(0..self.text.len())
        }
    }
}

/// Collapse whitespace the way the fuzzy matcher compares text.
pub fn normalize_whitespace(text: &str) -> String {
    let index = LineIndex::new(text);
    (0..index.len())
        .map(|i| NormalizedLine::new(index.line_text(text, i), true).text)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

impl FuzzyMatcher {
    pub fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }

    pub fn spans(&self, text: &str, pattern: &str) -> Result<Vec<Range<usize>>, MatchError> {
        let pattern_index = LineIndex::new(pattern);
        let needle: Vec<String> = (0..pattern_index.len())
            .map(|i| NormalizedLine::new(pattern_index.line_text(pattern, i), self.case_sensitive).text)
            .filter(|line| !line.is_empty())
            .collect();

        if needle.is_empty() {
            return Err(MatchError::EmptyPattern);
        }

        let index = LineIndex::new(text);
        let lines: Vec<(usize, NormalizedLine)> = (0..index.len())
            .map(|i| (i, NormalizedLine::new(index.line_text(text, i), self.case_sensitive)))
            .filter(|(_, line)| !line.text.is_empty())
            .collect();

        if needle.len() == 1 {
            Ok(single_line_spans(&index, &lines, &needle[0]))
        } else {
            Ok(block_spans(&index, &lines, &needle))
        }
    }
}

fn single_line_spans(
    index: &LineIndex,
    lines: &[(usize, NormalizedLine)],
    needle: &str,
) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    for (line_no, line) in lines {
        let Some(line_span) = index.get(*line_no) else {
            continue;
        };
        for (start, m) in line.text.match_indices(needle) {
            let range = line.original_range(start..start + m.len());
            spans.push(line_span.start + range.start..line_span.start + range.end);
        }
    }
    spans
}

fn block_spans(
    index: &LineIndex,
    lines: &[(usize, NormalizedLine)],
    needle: &[String],
) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut i = 0;

    while i + needle.len() <= lines.len() {
        let window = &lines[i..i + needle.len()];
        let is_match = window
            .iter()
            .zip(needle)
            .all(|((_, line), expected)| &line.text == expected);

        if !is_match {
            i += 1;
            continue;
        }

        let (first_no, first) = &window[0];
        let (last_no, last) = &window[needle.len() - 1];
        if let (Some(first_span), Some(last_span)) = (index.get(*first_no), index.get(*last_no)) {
            let start = first_span.start + first.content_range().start;
            let end = last_span.start + last.content_range().end;
            spans.push(start..end);
        }
        i += needle.len();
    }

    spans
}

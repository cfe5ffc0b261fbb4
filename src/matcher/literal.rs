use crate::matcher::errors::MatchError;
use regex::RegexBuilder;
use std::ops::Range;

/// Exact substring search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralMatcher {
    pub case_sensitive: bool,
    /// Only accept matches not touching a word character on either side.
    pub whole_word: bool,
}

impl Default for LiteralMatcher {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            whole_word: false,
        }
    }
}

impl LiteralMatcher {
    pub fn new(case_sensitive: bool, whole_word: bool) -> Self {
        Self {
            case_sensitive,
            whole_word,
        }
    }

    /// Byte spans of all non-overlapping occurrences, in order.
    pub fn spans(&self, text: &str, pattern: &str) -> Result<Vec<Range<usize>>, MatchError> {
        if pattern.is_empty() {
            return Err(MatchError::EmptyPattern);
        }

        let spans: Vec<Range<usize>> = if self.case_sensitive {
            text.match_indices(pattern)
                .map(|(start, m)| start..start + m.len())
                .collect()
        } else {
            let re = RegexBuilder::new(&regex::escape(pattern))
                .case_insensitive(true)
                .build()
                .map_err(|e| MatchError::InvalidRegex {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })?;
            re.find_iter(text).map(|m| m.range()).collect()
        };

        if !self.whole_word {
            return Ok(spans);
        }

        Ok(spans
            .into_iter()
            .filter(|span| is_word_bounded(text, span))
            .collect())
    }
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_word_bounded(text: &str, span: &Range<usize>) -> bool {
    let before = text[..span.start].chars().next_back();
    let after = text[span.end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

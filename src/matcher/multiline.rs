use crate::matcher::errors::MatchError;
use crate::matcher::literal::LiteralMatcher;
use crate::text::LineEnding;
use regex::RegexBuilder;
use std::ops::Range;

/// Matches patterns spanning several lines against the whole content.
///
/// Line breaks in the pattern are rewritten to the content's dominant
/// convention before searching, so a `\n` pattern finds `\r\n` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultilineMatcher {
    pub case_sensitive: bool,
    /// Treat the pattern as a regex where `.` also matches line breaks.
    pub regex: bool,
}

impl Default for MultilineMatcher {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            regex: false,
        }
    }
}

impl MultilineMatcher {
    pub fn new(case_sensitive: bool, regex: bool) -> Self {
        Self {
            case_sensitive,
            regex,
        }
    }

    pub fn spans(&self, text: &str, pattern: &str) -> Result<Vec<Range<usize>>, MatchError> {
        if pattern.is_empty() {
            return Err(MatchError::EmptyPattern);
        }

        if self.regex {
            let re = RegexBuilder::new(pattern)
                .case_insensitive(!self.case_sensitive)
                .multi_line(true)
                .dot_matches_new_line(true)
                .build()
                .map_err(|e| MatchError::InvalidRegex {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })?;
            return Ok(re.find_iter(text).map(|m| m.range()).collect());
        }

        let adapted = LineEnding::detect(text).apply(pattern);
        LiteralMatcher::new(self.case_sensitive, false).spans(text, &adapted)
    }
}

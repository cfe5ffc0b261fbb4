use crate::matcher::errors::MatchError;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;

/// User-supplied regular expression search.
///
/// Patterns are compiled with one flag set: case sensitivity. `^` and `$`
/// always anchor at line boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegexMatcher {
    pub case_sensitive: bool,
}

impl Default for RegexMatcher {
    fn default() -> Self {
        Self {
            case_sensitive: true,
        }
    }
}

/// Capture groups of one regex match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureSet {
    pub span: Range<usize>,
    pub text: String,
    /// Positional groups, starting at group 1. Unmatched groups are `None`.
    pub positional: Vec<Option<String>>,
    pub named: BTreeMap<String, String>,
}

impl RegexMatcher {
    pub fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }

    pub fn compile(&self, pattern: &str) -> Result<Regex, MatchError> {
        if pattern.is_empty() {
            return Err(MatchError::EmptyPattern);
        }
        RegexBuilder::new(pattern)
            .case_insensitive(!self.case_sensitive)
            .multi_line(true)
            .build()
            .map_err(|e| MatchError::InvalidRegex {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
    }

    pub fn spans(&self, text: &str, pattern: &str) -> Result<Vec<Range<usize>>, MatchError> {
        let re = self.compile(pattern)?;
        Ok(re.find_iter(text).map(|m| m.range()).collect())
    }

    /// Extract positional and named groups for every match.
    pub fn captures(&self, text: &str, pattern: &str) -> Result<Vec<CaptureSet>, MatchError> {
        let re = self.compile(pattern)?;
        let names: Vec<Option<&str>> = re.capture_names().collect();

        Ok(re
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let positional = (1..caps.len())
                    .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                    .collect();
                let named = names
                    .iter()
                    .flatten()
                    .filter_map(|name| {
                        caps.name(name)
                            .map(|m| (name.to_string(), m.as_str().to_string()))
                    })
                    .collect();
                Some(CaptureSet {
                    span: whole.range(),
                    text: whole.as_str().to_string(),
                    positional,
                    named,
                })
            })
            .collect())
    }

    /// Expand `$1` / `${name}` references in `replacement` for the match that
    /// starts at `span.start`.
    pub fn expand(
        &self,
        text: &str,
        span: &Range<usize>,
        pattern: &str,
        replacement: &str,
    ) -> Result<String, MatchError> {
        let re = self.compile(pattern)?;
        let mut out = String::new();
        match re.captures_at(text, span.start) {
            Some(caps) if caps.get(0).map(|m| m.start()) == Some(span.start) => {
                caps.expand(replacement, &mut out);
            }
            _ => out.push_str(replacement),
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pattern_is_descriptive() {
        let m = RegexMatcher::default();
        let err = m.spans("text", "fn (").unwrap_err();
        match err {
            MatchError::InvalidRegex { pattern, message } => {
                assert_eq!(pattern, "fn (");
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn anchors_are_line_based() {
        let m = RegexMatcher::default();
        let spans = m.spans("let a = 1;\nlet b = 2;\n", r"^let \w+").unwrap();
        assert_eq!(spans, vec![0..5, 11..16]);
    }

    #[test]
    fn case_flag_applies() {
        let m = RegexMatcher::new(false);
        assert_eq!(m.spans("TODO todo", "todo").unwrap().len(), 2);
        let m = RegexMatcher::new(true);
        assert_eq!(m.spans("TODO todo", "todo").unwrap().len(), 1);
    }

    #[test]
    fn captures_named_and_positional() {
        let m = RegexMatcher::default();
        let caps = m
            .captures("def load(path):", r"def (?P<name>\w+)\((\w*)\)")
            .unwrap();
        assert_eq!(caps.len(), 1);
        assert_eq!(caps[0].named.get("name").map(String::as_str), Some("load"));
        assert_eq!(
            caps[0].positional,
            vec![Some("load".to_string()), Some("path".to_string())]
        );
    }

    #[test]
    fn expand_uses_groups_of_selected_match() {
        let m = RegexMatcher::default();
        let text = "x = old(1)\ny = old(2)";
        let spans = m.spans(text, r"old\((\d)\)").unwrap();
        let out = m.expand(text, &spans[1], r"old\((\d)\)", "new($1)").unwrap();
        assert_eq!(out, "new(2)");
    }
}

//! Pattern matching strategies.
//!
//! Every strategy reduces to the same primitive: an ordered list of
//! non-overlapping byte spans in the searched text. [`Matcher`] wraps the
//! closed set of strategies and turns spans into [`MatchResult`]s with
//! line/column positions.

pub mod errors;
pub mod fuzzy;
pub mod literal;
pub mod multiline;
pub mod regexp;
pub mod structural;

pub use errors::MatchError;
pub use fuzzy::{normalize_whitespace, FuzzyMatcher};
pub use literal::LiteralMatcher;
pub use multiline::MultilineMatcher;
pub use regexp::{CaptureSet, RegexMatcher};
pub use structural::{StructuralMatch, StructuralMatcher};

use crate::text::{LineIndex, Position};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Which strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    Literal,
    Regex,
    Fuzzy,
    Multiline,
    Structural,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchStrategy::Literal => "literal",
            MatchStrategy::Regex => "regex",
            MatchStrategy::Fuzzy => "fuzzy",
            MatchStrategy::Multiline => "multiline",
            MatchStrategy::Structural => "structural",
        };
        f.write_str(name)
    }
}

/// Outcome of a search.
///
/// `positions` holds the start of every reported occurrence; `matched_text`
/// and `span` describe the first one. When `found` is false `positions` is
/// empty and `span` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub found: bool,
    pub positions: Vec<Position>,
    pub matched_text: String,
    pub strategy: MatchStrategy,
    pub span: Option<Range<usize>>,
}

impl MatchResult {
    pub fn not_found(strategy: MatchStrategy) -> Self {
        Self {
            found: false,
            positions: Vec::new(),
            matched_text: String::new(),
            strategy,
            span: None,
        }
    }

    fn from_spans(
        text: &str,
        index: &LineIndex,
        spans: &[Range<usize>],
        strategy: MatchStrategy,
    ) -> Self {
        let Some(first) = spans.first() else {
            return Self::not_found(strategy);
        };
        Self {
            found: true,
            positions: spans
                .iter()
                .map(|span| index.position(text, span.start))
                .collect(),
            matched_text: text[first.clone()].to_string(),
            strategy,
            span: Some(first.clone()),
        }
    }

    pub fn occurrences(&self) -> usize {
        self.positions.len()
    }
}

/// Caller-facing search flags. Exactly one search family is chosen from
/// them; see [`crate::engine::required_capabilities`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    pub case_sensitive: bool,
    pub whole_word: bool,
    pub regex: bool,
    /// Whitespace-insensitive (fuzzy) matching.
    pub flexible: bool,
    pub multiline: bool,
    /// ast-grep pattern matching; needs a known language.
    pub structural: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            whole_word: false,
            regex: false,
            flexible: false,
            multiline: false,
            structural: false,
        }
    }
}

/// The closed set of matching strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    Literal(LiteralMatcher),
    Regex(RegexMatcher),
    Fuzzy(FuzzyMatcher),
    Multiline(MultilineMatcher),
    Structural(StructuralMatcher),
}

impl Matcher {
    pub fn strategy(&self) -> MatchStrategy {
        match self {
            Matcher::Literal(_) => MatchStrategy::Literal,
            Matcher::Regex(_) => MatchStrategy::Regex,
            Matcher::Fuzzy(_) => MatchStrategy::Fuzzy,
            Matcher::Multiline(_) => MatchStrategy::Multiline,
            Matcher::Structural(_) => MatchStrategy::Structural,
        }
    }

    /// Ordered, non-overlapping byte spans of every occurrence.
    pub fn spans(&self, text: &str, pattern: &str) -> Result<Vec<Range<usize>>, MatchError> {
        match self {
            Matcher::Literal(m) => m.spans(text, pattern),
            Matcher::Regex(m) => m.spans(text, pattern),
            Matcher::Fuzzy(m) => m.spans(text, pattern),
            Matcher::Multiline(m) => m.spans(text, pattern),
            Matcher::Structural(m) => m.spans(text, pattern),
        }
    }

    /// Summary of all occurrences: every start position, first span.
    pub fn find(&self, text: &str, pattern: &str) -> Result<MatchResult, MatchError> {
        let spans = self.spans(text, pattern)?;
        let index = LineIndex::new(text);
        Ok(MatchResult::from_spans(text, &index, &spans, self.strategy()))
    }

    pub fn matches(&self, text: &str, pattern: &str) -> Result<bool, MatchError> {
        Ok(!self.spans(text, pattern)?.is_empty())
    }

    /// One result per occurrence, in document order.
    pub fn find_all(&self, text: &str, pattern: &str) -> Result<Vec<MatchResult>, MatchError> {
        let spans = self.spans(text, pattern)?;
        let index = LineIndex::new(text);
        Ok(spans
            .iter()
            .map(|span| {
                MatchResult::from_spans(text, &index, std::slice::from_ref(span), self.strategy())
            })
            .collect())
    }

    /// Text to splice in for the occurrence at `span`. Regex replacements may
    /// reference capture groups and structural ones metavariables; other
    /// strategies insert `replacement` as is.
    pub fn replacement_for(
        &self,
        text: &str,
        span: &Range<usize>,
        pattern: &str,
        replacement: &str,
    ) -> Result<String, MatchError> {
        match self {
            Matcher::Regex(m) => m.expand(text, span, pattern, replacement),
            Matcher::Structural(m) => m.expand(text, span, pattern, replacement),
            _ => Ok(replacement.to_string()),
        }
    }
}

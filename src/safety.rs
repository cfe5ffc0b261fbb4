//! Risk classification of a match site.
//!
//! A pattern that lands inside a comment or a string literal is probably not
//! the code the caller meant to edit. The analysis only downgrades the
//! reported classification; it never blocks an operation.

use crate::lang::SupportLang;
use crate::text::LineIndex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    #[default]
    Safe,
    /// Pattern is not unique in the file.
    Caution,
    /// Match sits inside a comment or string literal.
    Risky,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SafetyReport {
    pub level: SafetyLevel,
    pub reasons: Vec<String>,
}

/// Lexical context of a byte offset within its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteContext {
    Code,
    Comment,
    StringLiteral,
}

pub fn analyze(
    text: &str,
    span: &Range<usize>,
    occurrences: usize,
    lang: Option<SupportLang>,
) -> SafetyReport {
    let mut report = SafetyReport::default();

    match site_context(text, span.start, lang) {
        SiteContext::Comment => {
            report.level = SafetyLevel::Risky;
            report.reasons.push("match is inside a comment".to_string());
        }
        SiteContext::StringLiteral => {
            report.level = SafetyLevel::Risky;
            report
                .reasons
                .push("match is inside a string literal".to_string());
        }
        SiteContext::Code => {}
    }

    if occurrences > 1 {
        report.level = report.level.max(SafetyLevel::Caution);
        report
            .reasons
            .push(format!("pattern occurs {occurrences} times"));
    }

    report
}

/// Classify `offset` by scanning its line up to that point.
///
/// Single-line heuristics only: block comments and strings opened on an
/// earlier line are not tracked.
pub fn site_context(text: &str, offset: usize, lang: Option<SupportLang>) -> SiteContext {
    let index = LineIndex::new(text);
    let line = index.line_of(offset);
    let Some(span) = index.get(line) else {
        return SiteContext::Code;
    };
    let prefix = text.get(span.start..offset.max(span.start)).unwrap_or("");

    let (slash_comments, hash_comments) = comment_styles(lang);
    // Rust lifetimes ('a) would otherwise open a bogus char literal.
    let single_quotes = !matches!(lang, Some(SupportLang::Rust));

    let mut quote: Option<char> = None;
    let mut in_block_comment = false;
    let mut chars = prefix.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_block_comment {
            if ch == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block_comment = false;
            }
            continue;
        }

        if let Some(open) = quote {
            if ch == '\\' {
                chars.next();
            } else if ch == open {
                quote = None;
            }
            continue;
        }

        match ch {
            '"' | '`' => quote = Some(ch),
            '\'' if single_quotes => quote = Some(ch),
            '/' if slash_comments && chars.peek() == Some(&'/') => return SiteContext::Comment,
            '/' if slash_comments && chars.peek() == Some(&'*') => {
                chars.next();
                in_block_comment = true;
            }
            '#' if hash_comments => return SiteContext::Comment,
            _ => {}
        }
    }

    if in_block_comment {
        SiteContext::Comment
    } else if quote.is_some() {
        SiteContext::StringLiteral
    } else {
        SiteContext::Code
    }
}

/// (`//` and `/* */` comments, `#` comments)
fn comment_styles(lang: Option<SupportLang>) -> (bool, bool) {
    match lang {
        Some(SupportLang::Python)
        | Some(SupportLang::Ruby)
        | Some(SupportLang::Bash)
        | Some(SupportLang::Yaml) => (false, true),
        Some(SupportLang::Json) | Some(SupportLang::Html) => (false, false),
        Some(_) => (true, false),
        None => (true, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_match_is_safe() {
        let text = "value = compute(x)\n";
        let report = analyze(text, &(8..15), 1, Some(SupportLang::Python));
        assert_eq!(report.level, SafetyLevel::Safe);
        assert!(report.reasons.is_empty());
    }

    #[test]
    fn python_comment_is_risky() {
        let text = "x = 1  # compute later\n";
        let start = text.find("compute").unwrap();
        let ctx = site_context(text, start, Some(SupportLang::Python));
        assert_eq!(ctx, SiteContext::Comment);
    }

    #[test]
    fn string_literal_is_risky() {
        let text = "let msg = \"call compute() now\";\n";
        let start = text.find("compute").unwrap();
        let report = analyze(text, &(start..start + 7), 1, Some(SupportLang::Rust));
        assert_eq!(report.level, SafetyLevel::Risky);
    }

    #[test]
    fn rust_lifetimes_do_not_open_strings() {
        let text = "fn get<'a>(s: &'a str) -> &'a str { compute(s) }\n";
        let start = text.find("compute").unwrap();
        assert_eq!(
            site_context(text, start, Some(SupportLang::Rust)),
            SiteContext::Code
        );
    }

    #[test]
    fn escaped_quotes_stay_inside_string() {
        let text = r#"s = "say \"hi\" compute""#;
        let start = text.find("compute").unwrap();
        assert_eq!(site_context(text, start, None), SiteContext::StringLiteral);
    }

    #[test]
    fn closed_block_comment_returns_to_code() {
        let text = "int x = /* old */ compute();\n";
        let start = text.find("compute").unwrap();
        assert_eq!(
            site_context(text, start, Some(SupportLang::C)),
            SiteContext::Code
        );
    }

    #[test]
    fn repeated_pattern_is_caution() {
        let report = analyze("foo foo", &(0..3), 2, None);
        assert_eq!(report.level, SafetyLevel::Caution);
    }
}

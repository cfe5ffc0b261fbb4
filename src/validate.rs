//! Post-write syntax validation.
//!
//! The check depends on the file type:
//! - Rust: full-document `syn` parse. When the original already failed to
//!   parse, fall back to comparing tree-sitter error counts so pre-existing
//!   breakage does not block unrelated edits.
//! - Other languages with a bundled grammar: tree-sitter parse, failing when
//!   the edit introduces ERROR or MISSING nodes.
//! - Brace-delimited languages without a grammar: delimiter balance.
//! - Anything else is not checked.
//!
//! Validation always compares against the original so an edit is only
//! blamed for breakage it introduced.

use crate::lang::{self, SupportLang};
use crate::pool::{self, ParserError};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{language} parse errors introduced: {count} new ERROR nodes (first at {})", first_location(.errors))]
    ParseErrorIntroduced {
        language: String,
        count: usize,
        errors: Vec<ErrorLocation>,
    },

    #[error("rust syntax error: {message}")]
    SynValidationFailed { message: String },

    #[error("unbalanced delimiters: {message}")]
    UnbalancedDelimiters { message: String },

    #[error(transparent)]
    Parser(#[from] ParserError),
}

fn first_location(errors: &[ErrorLocation]) -> String {
    errors
        .first()
        .map(|e| format!("{}:{}", e.line, e.column))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Location of an error node in the source, 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorLocation {
    pub byte_start: usize,
    pub byte_end: usize,
    pub line: usize,
    pub column: usize,
    pub context: String,
}

/// Which check applies to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checker {
    Syn,
    TreeSitter(SupportLang),
    Braces,
    Unchecked,
}

/// Extensions of brace-delimited languages without a bundled grammar.
const BRACE_EXTENSIONS: &[&str] = &[
    "php", "dart", "groovy", "gradle", "zig", "proto", "scss", "less", "jsonc", "sol", "hx", "m",
    "mm", "v", "d",
];

impl Checker {
    pub fn for_path(path: &Path) -> Self {
        if let Some(lang) = lang::from_path(path) {
            return Self::for_language(lang);
        }
        let is_brace = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| BRACE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if is_brace {
            Checker::Braces
        } else {
            Checker::Unchecked
        }
    }

    pub fn for_language(lang: SupportLang) -> Self {
        match lang {
            SupportLang::Rust => Checker::Syn,
            other => Checker::TreeSitter(other),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Checker::Syn => "syn".to_string(),
            Checker::TreeSitter(lang) => format!("tree-sitter:{}", lang::name(*lang)),
            Checker::Braces => "delimiters".to_string(),
            Checker::Unchecked => "none".to_string(),
        }
    }

    /// Check that `edited` introduces no syntax errors absent from
    /// `original`. Returns whether a real check ran.
    pub fn validate_edit(&self, original: &str, edited: &str) -> Result<bool, ValidationError> {
        match self {
            Checker::Syn => {
                if syn::parse_file(edited).is_ok() {
                    return Ok(true);
                }
                match syn::parse_file(original) {
                    Ok(_) => Err(syn_error(edited)),
                    Err(_) => tree_sitter_compare(SupportLang::Rust, original, edited).map(|_| true),
                }
            }
            Checker::TreeSitter(lang) => tree_sitter_compare(*lang, original, edited).map(|_| true),
            Checker::Braces => {
                let before = delimiter_problems(original);
                let after = delimiter_problems(edited);
                if after.len() > before.len() {
                    return Err(ValidationError::UnbalancedDelimiters {
                        message: after.join("; "),
                    });
                }
                Ok(true)
            }
            Checker::Unchecked => Ok(false),
        }
    }
}

fn syn_error(source: &str) -> ValidationError {
    let message = match syn::parse_file(source) {
        Err(e) => e.to_string(),
        Ok(_) => "unknown error".to_string(),
    };
    ValidationError::SynValidationFailed { message }
}

fn tree_sitter_compare(lang: SupportLang, original: &str, edited: &str) -> Result<(), ValidationError> {
    let original_count = pool::parse(lang, original)
        .map(|tree| collect_errors(tree.root_node(), original).len())?;
    let edited_tree = pool::parse(lang, edited)?;
    let edited_errors = collect_errors(edited_tree.root_node(), edited);

    if edited_errors.len() > original_count {
        return Err(ValidationError::ParseErrorIntroduced {
            language: lang::name(lang),
            count: edited_errors.len() - original_count,
            errors: edited_errors,
        });
    }
    Ok(())
}

/// Parse `source` on its own and report every error node.
pub fn parse_errors(lang: SupportLang, source: &str) -> Result<Vec<ErrorLocation>, ValidationError> {
    let tree = pool::parse(lang, source)?;
    Ok(collect_errors(tree.root_node(), source))
}

fn collect_errors(root: tree_sitter::Node<'_>, source: &str) -> Vec<ErrorLocation> {
    let mut errors = Vec::new();
    collect_errors_recursive(root, source, &mut errors);
    errors
}

fn collect_errors_recursive(
    node: tree_sitter::Node<'_>,
    source: &str,
    errors: &mut Vec<ErrorLocation>,
) {
    if node.is_error() || node.is_missing() {
        let start = node.start_position();
        let byte_start = node.start_byte();
        let byte_end = node.end_byte();

        let context = source
            .get(floor_boundary(source, byte_start.saturating_sub(20))..floor_boundary(source, (byte_end + 20).min(source.len())))
            .unwrap_or("")
            .replace('\n', "\\n");

        errors.push(ErrorLocation {
            byte_start,
            byte_end,
            line: start.row + 1,
            column: start.column + 1,
            context,
        });
    }

    // Subtrees without errors cannot contain any.
    if !node.has_error() {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_errors_recursive(child, source, errors);
    }
}

fn floor_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Unmatched or mismatched `()[]{}`, skipping string literals and
/// `//`, `/* */` comments.
pub fn delimiter_problems(source: &str) -> Vec<String> {
    let mut problems = Vec::new();
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut line = 1;
    let mut chars = source.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\n' => line += 1,
            '"' | '\'' | '`' => {
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            chars.next();
                        }
                        '\n' if ch != '`' => {
                            line += 1;
                            break;
                        }
                        '\n' => line += 1,
                        c if c == ch => break,
                        _ => {}
                    }
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            '(' | '[' | '{' => stack.push((ch, line)),
            ')' | ']' | '}' => {
                let open = match ch {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((o, _)) if o == open => {}
                    Some((o, l)) => {
                        problems.push(format!("'{ch}' on line {line} closes '{o}' from line {l}"))
                    }
                    None => problems.push(format!("unmatched '{ch}' on line {line}")),
                }
            }
            _ => {}
        }
    }

    problems.extend(
        stack
            .into_iter()
            .map(|(o, l)| format!("unclosed '{o}' from line {l}")),
    );
    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checker_follows_extension() {
        assert_eq!(Checker::for_path(Path::new("a.rs")), Checker::Syn);
        assert_eq!(
            Checker::for_path(Path::new("a.py")),
            Checker::TreeSitter(SupportLang::Python)
        );
        assert_eq!(Checker::for_path(Path::new("a.php")), Checker::Braces);
        assert_eq!(Checker::for_path(Path::new("notes.txt")), Checker::Unchecked);
    }

    #[test]
    fn syn_rejects_broken_rust() {
        let checker = Checker::Syn;
        assert!(checker
            .validate_edit("fn main() {}", "fn main() { let x = 1; }")
            .unwrap());
        assert!(matches!(
            checker.validate_edit("fn main() {}", "fn main( {}"),
            Err(ValidationError::SynValidationFailed { .. })
        ));
    }

    #[test]
    fn preexisting_rust_errors_do_not_block() {
        let checker = Checker::Syn;
        let original = "fn main( { }";
        let edited = "fn main( { let x = 1; }";
        assert!(checker.validate_edit(original, edited).is_ok());
    }

    #[test]
    fn tree_sitter_detects_new_errors() {
        let checker = Checker::TreeSitter(SupportLang::Python);
        let original = "def f():\n    return 1\n";
        assert!(checker
            .validate_edit(original, "def f():\n    return 2\n")
            .is_ok());
        let err = checker
            .validate_edit(original, "def f(:\n    return 1\n")
            .unwrap_err();
        assert!(matches!(err, ValidationError::ParseErrorIntroduced { .. }));
    }

    #[test]
    fn delimiters_ignore_strings_and_comments() {
        assert!(delimiter_problems("f(\"(\", '[') // {\n").is_empty());
        assert!(delimiter_problems("/* } */ { }").is_empty());
        assert_eq!(delimiter_problems("{ (").len(), 2);
        assert_eq!(delimiter_problems("( ]").len(), 1);
    }

    #[test]
    fn braces_checker_blames_only_new_problems() {
        let checker = Checker::Braces;
        assert!(checker.validate_edit("{", "{ x").is_ok());
        assert!(checker.validate_edit("{}", "{").is_err());
    }

    #[test]
    fn unchecked_reports_no_check() {
        assert!(!Checker::Unchecked.validate_edit("a", "b").unwrap());
    }

    #[test]
    fn parse_errors_have_locations() {
        let errors = parse_errors(SupportLang::Rust, "fn main( { }").unwrap();
        assert!(!errors.is_empty());
        assert_eq!(errors[0].line, 1);
    }
}

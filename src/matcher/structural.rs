use crate::cache;
use crate::matcher::errors::MatchError;
use ast_grep_core::meta_var::MetaVariable;
use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::{AstGrep, NodeMatch};
use ast_grep_language::SupportLang;
use std::collections::HashMap;
use std::ops::Range;

/// Syntax-aware search using ast-grep's metavariable syntax.
///
/// # Metavariable Syntax
///
/// - `$NAME` - Matches a single node and captures it
/// - `$$$NAME` - Matches zero or more nodes (variadic)
/// - `$_` - Matches any single node (anonymous)
///
/// Matches never land inside comments or string literals, which is why the
/// selector prefers this engine when the language is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralMatcher {
    pub lang: SupportLang,
}

/// One structural match with its captured metavariables. A `$$$NAME`
/// capture holds the source text spanning its nodes, separators included.
#[derive(Debug, Clone)]
pub struct StructuralMatch {
    pub span: Range<usize>,
    pub text: String,
    pub captures: HashMap<String, String>,
}

impl StructuralMatcher {
    pub fn new(lang: SupportLang) -> Self {
        Self { lang }
    }

    pub fn spans(&self, text: &str, pattern: &str) -> Result<Vec<Range<usize>>, MatchError> {
        Ok(self
            .find_all(text, pattern)?
            .into_iter()
            .map(|m| m.span)
            .collect())
    }

    pub fn find_all(&self, text: &str, pattern: &str) -> Result<Vec<StructuralMatch>, MatchError> {
        if pattern.trim().is_empty() {
            return Err(MatchError::EmptyPattern);
        }

        let pat = cache::get_or_compile_pattern(pattern, self.lang).map_err(|message| {
            MatchError::InvalidStructuralPattern {
                pattern: pattern.to_string(),
                message,
            }
        })?;

        let sg = AstGrep::new(text, self.lang);
        let root = sg.root();
        let results = root
            .find_all(&pat)
            .map(|m| to_structural_match(text, m))
            .collect();
        Ok(results)
    }

    /// Substitute the captures of the match at `span` into `replacement`.
    /// `$NAME` and `$$$NAME` are replaced when captured and kept otherwise.
    pub fn expand(
        &self,
        text: &str,
        span: &Range<usize>,
        pattern: &str,
        replacement: &str,
    ) -> Result<String, MatchError> {
        let matches = self.find_all(text, pattern)?;
        Ok(match matches.iter().find(|m| m.span == *span) {
            Some(m) => substitute(replacement, &m.captures),
            None => replacement.to_string(),
        })
    }
}

fn to_structural_match(source: &str, m: NodeMatch<StrDoc<SupportLang>>) -> StructuralMatch {
    let range = m.get_node().range();
    let text = source[range.clone()].to_string();

    let env = m.get_env();
    let mut captures = HashMap::new();
    for var in env.get_matched_variables() {
        match var {
            MetaVariable::Capture(name, _) => {
                if let Some(node) = env.get_match(&name) {
                    let captured = node.text().to_string();
                    captures.insert(name, captured);
                }
            }
            MetaVariable::MultiCapture(name) => {
                let nodes = env.get_multiple_matches(&name);
                let captured = match (nodes.first(), nodes.last()) {
                    (Some(first), Some(last)) => {
                        source[first.range().start..last.range().end].to_string()
                    }
                    _ => String::new(),
                };
                captures.insert(name, captured);
            }
            _ => {}
        }
    }

    StructuralMatch {
        span: range,
        text,
        captures,
    }
}

fn substitute(template: &str, captures: &HashMap<String, String>) -> String {
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len());
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        let name_start = if template[i..].starts_with("$$$") { i + 3 } else { i + 1 };
        let name_len = template[name_start..]
            .bytes()
            .take_while(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || *b == b'_')
            .count();
        let name = &template[name_start..name_start + name_len];
        match captures.get(name).filter(|_| name_len > 0) {
            Some(value) => {
                out.push_str(&template[copied..i]);
                out.push_str(value);
                i = name_start + name_len;
                copied = i;
            }
            None => i += 1,
        }
    }
    out.push_str(&template[copied..]);
    out
}

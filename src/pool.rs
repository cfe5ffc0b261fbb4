//! Thread-local parser pooling.
//!
//! Creating a tree-sitter parser and loading a grammar is not free, and a
//! batch validates the same language over and over. Each thread keeps one
//! parser per language, created on first use.

use crate::lang::{self, SupportLang};
use ast_grep_language::LanguageExt;
use std::cell::RefCell;
use std::collections::HashMap;
use thiserror::Error;
use tree_sitter::{Parser, Tree};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    #[error("failed to load the {0} grammar")]
    LanguageSet(String),

    #[error("tree-sitter failed to parse {0} source")]
    ParseFailed(String),
}

thread_local! {
    static PARSERS: RefCell<HashMap<String, Parser>> = RefCell::new(HashMap::new());
}

/// Execute `f` with the pooled parser for `lang`.
pub fn with_parser<F, R>(lang: SupportLang, f: F) -> Result<R, ParserError>
where
    F: FnOnce(&mut Parser) -> R,
{
    PARSERS.with(|cell| {
        let mut parsers = cell.borrow_mut();
        let key = lang::name(lang);
        if !parsers.contains_key(&key) {
            let mut parser = Parser::new();
            parser
                .set_language(&lang.get_ts_language())
                .map_err(|_| ParserError::LanguageSet(key.clone()))?;
            parsers.insert(key.clone(), parser);
        }
        match parsers.get_mut(&key) {
            Some(parser) => Ok(f(parser)),
            None => Err(ParserError::LanguageSet(key)),
        }
    })
}

/// Parse `source` with the pooled parser for `lang`.
pub fn parse(lang: SupportLang, source: &str) -> Result<Tree, ParserError> {
    with_parser(lang, |parser| parser.parse(source, None))?
        .ok_or_else(|| ParserError::ParseFailed(lang::name(lang)))
}

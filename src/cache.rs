//! Thread-local compilation cache for structural patterns.
//!
//! Compiling an ast-grep pattern parses it with tree-sitter, so repeated
//! searches with the same pattern (batches, `find` followed by `find_all`)
//! reuse the compiled form. Capped at 256 entries; the cache is cleared when
//! full.

use ast_grep_core::Pattern;
use ast_grep_language::SupportLang;
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    // Key is "<lang_debug>:<pattern_str>" so the same pattern text compiled
    // for two languages never collides.
    static PATTERN_CACHE: RefCell<HashMap<String, Pattern>> =
        RefCell::new(HashMap::new());
}

/// Get a compiled pattern from cache, or compile and cache it.
///
/// Compilation errors are returned as their display text and never cached.
pub fn get_or_compile_pattern(pattern_str: &str, lang: SupportLang) -> Result<Pattern, String> {
    let cache_key = format!("{lang:?}:{pattern_str}");

    PATTERN_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(p) = cache.get(&cache_key) {
            return Ok(p.clone());
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = Pattern::try_new(pattern_str, lang).map_err(|e| e.to_string())?;
        cache.insert(cache_key, compiled.clone());
        Ok(compiled)
    })
}

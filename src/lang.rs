//! Language inference for structural matching and syntax validation.
//!
//! Grammars come from `ast-grep-language`, so every language listed here can
//! be parsed with tree-sitter and searched with ast-grep patterns.

pub use ast_grep_language::SupportLang;
use std::path::Path;

/// Map a file extension to a bundled grammar.
pub fn from_extension(ext: &str) -> Option<SupportLang> {
    let lang = match ext.to_ascii_lowercase().as_str() {
        "rs" => SupportLang::Rust,
        "py" | "pyi" => SupportLang::Python,
        "js" | "mjs" | "cjs" | "jsx" => SupportLang::JavaScript,
        "ts" | "mts" | "cts" => SupportLang::TypeScript,
        "tsx" => SupportLang::Tsx,
        "go" => SupportLang::Go,
        "java" => SupportLang::Java,
        "kt" | "kts" => SupportLang::Kotlin,
        "c" | "h" => SupportLang::C,
        "cc" | "cpp" | "cxx" | "hpp" | "hh" | "hxx" => SupportLang::Cpp,
        "cs" => SupportLang::CSharp,
        "rb" => SupportLang::Ruby,
        "swift" => SupportLang::Swift,
        "scala" => SupportLang::Scala,
        "lua" => SupportLang::Lua,
        "sh" | "bash" => SupportLang::Bash,
        "json" => SupportLang::Json,
        "yaml" | "yml" => SupportLang::Yaml,
        "css" => SupportLang::Css,
        "html" | "htm" => SupportLang::Html,
        _ => return None,
    };
    Some(lang)
}

pub fn from_path(path: impl AsRef<Path>) -> Option<SupportLang> {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(from_extension)
}

/// Resolve a user-supplied language hint such as `rust`, `py` or `.ts`.
pub fn from_hint(hint: &str) -> Option<SupportLang> {
    let hint = hint.trim().trim_start_matches('.');
    if hint.is_empty() {
        return None;
    }
    from_extension(hint)
        .or_else(|| from_name(hint))
        .or_else(|| hint.parse::<SupportLang>().ok())
}

fn from_name(name: &str) -> Option<SupportLang> {
    let lang = match name.to_ascii_lowercase().as_str() {
        "rust" => SupportLang::Rust,
        "python" => SupportLang::Python,
        "javascript" => SupportLang::JavaScript,
        "typescript" => SupportLang::TypeScript,
        "golang" => SupportLang::Go,
        "kotlin" => SupportLang::Kotlin,
        "c++" => SupportLang::Cpp,
        "csharp" | "c#" => SupportLang::CSharp,
        "ruby" => SupportLang::Ruby,
        "shell" => SupportLang::Bash,
        _ => return None,
    };
    Some(lang)
}

/// Stable lowercase name used in diagnostics and capability lists.
pub fn name(lang: SupportLang) -> String {
    format!("{lang:?}").to_ascii_lowercase()
}

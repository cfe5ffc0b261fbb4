//! Engine registry and capability-based selection.
//!
//! An [`Engine`] declares the capabilities it supports. The registry is an
//! explicit object built once and passed to whoever needs it; selection is a
//! pure function of the registry, the requested capabilities and the
//! language hint.

use crate::lang::{self, SupportLang};
use crate::matcher::{
    FuzzyMatcher, LiteralMatcher, MatchOptions, MatchStrategy, Matcher, MultilineMatcher,
    RegexMatcher, StructuralMatcher,
};
use crate::operation::OperationType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// A named feature an engine can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    LiteralSearch,
    RegexSearch,
    FuzzySearch,
    MultilineSearch,
    StructuralSearch,
    Create,
    Write,
    LanguageSpecific,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::LiteralSearch => "literal_search",
            Capability::RegexSearch => "regex_search",
            Capability::FuzzySearch => "fuzzy_search",
            Capability::MultilineSearch => "multiline_search",
            Capability::StructuralSearch => "structural_search",
            Capability::Create => "create",
            Capability::Write => "write",
            Capability::LanguageSpecific => "language_specific",
        };
        f.write_str(name)
    }
}

pub type CapabilitySet = BTreeSet<Capability>;

/// Availability of an engine for a particular request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    Available,
    NotSupported { reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("no engine supports [{}]{}", format_caps(.required), format_reasons(.reasons))]
    CapabilityMismatch {
        required: CapabilitySet,
        reasons: Vec<String>,
    },
}

fn format_caps(caps: &CapabilitySet) -> String {
    caps.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_reasons(reasons: &[String]) -> String {
    if reasons.is_empty() {
        String::new()
    } else {
        format!(" ({})", reasons.join("; "))
    }
}

/// A matching backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engine {
    pub name: String,
    pub strategy: MatchStrategy,
    pub capabilities: CapabilitySet,
    /// Languages the engine has explicit support for. Empty means generic.
    pub languages: Vec<SupportLang>,
    /// Higher wins among otherwise equal candidates.
    pub priority: u8,
}

impl Engine {
    pub fn new(
        name: impl Into<String>,
        strategy: MatchStrategy,
        capabilities: impl IntoIterator<Item = Capability>,
        priority: u8,
    ) -> Self {
        Self {
            name: name.into(),
            strategy,
            capabilities: capabilities.into_iter().collect(),
            languages: Vec::new(),
            priority,
        }
    }

    pub fn with_languages(mut self, languages: impl IntoIterator<Item = SupportLang>) -> Self {
        self.languages = languages.into_iter().collect();
        self
    }

    pub fn supports(&self, required: &CapabilitySet) -> bool {
        required.is_subset(&self.capabilities)
    }

    pub fn is_generic(&self) -> bool {
        self.languages.is_empty()
    }

    pub fn handles_language(&self, lang: Option<SupportLang>) -> bool {
        lang.is_some_and(|l| self.languages.contains(&l))
    }

    /// Whether the engine can serve a request for `lang`.
    ///
    /// Language-specific engines report `NotSupported` instead of failing
    /// when the language is unknown or outside their grammar set.
    pub fn status(&self, lang: Option<SupportLang>, hint: Option<&str>) -> EngineStatus {
        if self.is_generic() {
            return EngineStatus::Available;
        }
        match (lang, hint) {
            (Some(l), _) if self.languages.contains(&l) => EngineStatus::Available,
            (Some(l), _) => EngineStatus::NotSupported {
                reason: format!("{} has no grammar for {}", self.name, lang::name(l)),
            },
            (None, Some(h)) => EngineStatus::NotSupported {
                reason: format!("{} does not recognize language '{h}'", self.name),
            },
            (None, None) => EngineStatus::NotSupported {
                reason: format!("{} needs a language hint", self.name),
            },
        }
    }

    /// Instantiate the matcher for this engine.
    ///
    /// Returns `None` for a language-specific engine without a language;
    /// callers only build matchers for engines reported `Available`.
    pub fn build_matcher(
        &self,
        options: &MatchOptions,
        lang: Option<SupportLang>,
    ) -> Option<Matcher> {
        let cs = options.case_sensitive;
        let matcher = match self.strategy {
            MatchStrategy::Literal => {
                Matcher::Literal(LiteralMatcher::new(cs, options.whole_word))
            }
            MatchStrategy::Regex => Matcher::Regex(RegexMatcher::new(cs)),
            MatchStrategy::Fuzzy => Matcher::Fuzzy(FuzzyMatcher::new(cs)),
            MatchStrategy::Multiline => {
                Matcher::Multiline(MultilineMatcher::new(cs, options.regex))
            }
            MatchStrategy::Structural => Matcher::Structural(StructuralMatcher::new(lang?)),
        };
        Some(matcher)
    }
}

/// The engine chosen for a request.
#[derive(Debug, Clone)]
pub struct EngineSelection<'a> {
    pub engine: &'a Engine,
    pub language: Option<SupportLang>,
    /// Set when the preferred engine was unavailable and a native engine
    /// was used instead.
    pub fallback: Option<String>,
}

/// Languages the bundled ast-grep engine declares explicit support for.
pub const STRUCTURAL_LANGUAGES: &[SupportLang] = &[
    SupportLang::Rust,
    SupportLang::Python,
    SupportLang::JavaScript,
    SupportLang::TypeScript,
    SupportLang::Tsx,
    SupportLang::Go,
    SupportLang::Java,
    SupportLang::Kotlin,
    SupportLang::C,
    SupportLang::Cpp,
    SupportLang::CSharp,
    SupportLang::Ruby,
    SupportLang::Swift,
    SupportLang::Scala,
    SupportLang::Lua,
    SupportLang::Bash,
    SupportLang::Json,
    SupportLang::Yaml,
    SupportLang::Css,
    SupportLang::Html,
];

/// Registered engines.
#[derive(Debug, Clone, Default)]
pub struct EngineRegistry {
    engines: Vec<Engine>,
}

impl EngineRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Native matchers plus the ast-grep structural backend.
    pub fn with_defaults() -> Self {
        use Capability::*;

        let mut registry = Self::new();
        registry.register(Engine::new(
            "literal",
            MatchStrategy::Literal,
            [LiteralSearch, Create, Write],
            50,
        ));
        registry.register(Engine::new(
            "regex",
            MatchStrategy::Regex,
            [RegexSearch, Create, Write],
            40,
        ));
        registry.register(Engine::new(
            "fuzzy",
            MatchStrategy::Fuzzy,
            [FuzzySearch, Create, Write],
            30,
        ));
        registry.register(Engine::new(
            "multiline",
            MatchStrategy::Multiline,
            [MultilineSearch, LiteralSearch, RegexSearch, Create, Write],
            20,
        ));
        registry.register(
            Engine::new(
                "ast-grep",
                MatchStrategy::Structural,
                [StructuralSearch, LanguageSpecific, Write],
                60,
            )
            .with_languages(STRUCTURAL_LANGUAGES.iter().copied()),
        );
        registry
    }

    pub fn register(&mut self, engine: Engine) {
        self.engines.push(engine);
    }

    pub fn engines(&self) -> &[Engine] {
        &self.engines
    }

    pub fn get(&self, name: &str) -> Option<&Engine> {
        self.engines.iter().find(|e| e.name == name)
    }

    /// Pick the best engine for an operation.
    ///
    /// Engines must declare every required capability plus the one implied
    /// by the operation. Among available candidates an engine with explicit
    /// support for the hinted language beats a generic one; ties go to the
    /// higher priority. When only structural engines qualify and none is
    /// available, the request is retried against the native literal
    /// matchers and the reason is recorded in
    /// [`EngineSelection::fallback`].
    pub fn select_best_engine(
        &self,
        operation: OperationType,
        required: &CapabilitySet,
        language_hint: Option<&str>,
    ) -> Result<EngineSelection<'_>, EngineError> {
        let lang = language_hint.and_then(lang::from_hint);
        let mut needed = required.clone();
        needed.insert(operation_capability(operation));

        let mut reasons = Vec::new();
        if let Some(engine) = self.best_available(&needed, lang, language_hint, &mut reasons) {
            debug!(engine = %engine.name, ?lang, "selected engine");
            return Ok(EngineSelection {
                engine,
                language: lang,
                fallback: None,
            });
        }

        if needed.contains(&Capability::StructuralSearch) {
            let mut native = needed.clone();
            native.remove(&Capability::StructuralSearch);
            native.remove(&Capability::LanguageSpecific);
            native.insert(Capability::LiteralSearch);

            let mut native_reasons = Vec::new();
            if let Some(engine) =
                self.best_available(&native, lang, language_hint, &mut native_reasons)
            {
                let why = if reasons.is_empty() {
                    "no structural engine registered".to_string()
                } else {
                    reasons.join("; ")
                };
                let fallback = format!("{why}; falling back to {} matching", engine.name);
                debug!(engine = %engine.name, %fallback, "structural engine unavailable");
                return Ok(EngineSelection {
                    engine,
                    language: lang,
                    fallback: Some(fallback),
                });
            }
            reasons.extend(native_reasons);
        }

        Err(EngineError::CapabilityMismatch {
            required: needed,
            reasons,
        })
    }

    fn best_available(
        &self,
        needed: &CapabilitySet,
        lang: Option<SupportLang>,
        hint: Option<&str>,
        reasons: &mut Vec<String>,
    ) -> Option<&Engine> {
        let mut candidates: Vec<&Engine> = Vec::new();
        for engine in self.engines.iter().filter(|e| e.supports(needed)) {
            match engine.status(lang, hint) {
                EngineStatus::Available => candidates.push(engine),
                EngineStatus::NotSupported { reason } => reasons.push(reason),
            }
        }

        candidates.into_iter().max_by_key(|engine| {
            (engine.handles_language(lang), engine.priority)
        })
    }
}

fn operation_capability(operation: OperationType) -> Capability {
    match operation {
        OperationType::Create => Capability::Create,
        _ => Capability::Write,
    }
}

/// Capabilities a search with these options needs.
pub fn required_capabilities(options: &MatchOptions, pattern: &str) -> CapabilitySet {
    let mut caps = CapabilitySet::new();
    if options.structural {
        caps.insert(Capability::StructuralSearch);
    } else if options.flexible {
        caps.insert(Capability::FuzzySearch);
    } else if options.multiline || (!options.regex && pattern.contains('\n')) {
        caps.insert(Capability::MultilineSearch);
        if options.regex {
            caps.insert(Capability::RegexSearch);
        }
    } else if options.regex {
        caps.insert(Capability::RegexSearch);
    } else {
        caps.insert(Capability::LiteralSearch);
    }
    caps
}

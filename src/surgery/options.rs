use crate::matcher::MatchOptions;
use serde::{Deserialize, Serialize};

/// Per-operation options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurgeryOptions {
    #[serde(flatten)]
    pub matching: MatchOptions,
    /// 1-based occurrence to act on. Defaults to the first.
    pub occurrence: Option<usize>,
    /// Replace every occurrence (replace only).
    pub replace_all: bool,
    pub max_replacements: Option<usize>,
    /// Compute and validate without touching the file.
    pub dry_run: bool,
    /// Allow `create` to overwrite an existing file.
    pub overwrite: bool,
    /// Language for structural matching and validation, e.g. `rust` or
    /// `py`. Defaults to the file extension.
    pub language: Option<String>,
}

impl SurgeryOptions {
    pub fn occurrence(mut self, n: usize) -> Self {
        self.occurrence = Some(n);
        self
    }

    pub fn replace_all(mut self, max: Option<usize>) -> Self {
        self.replace_all = true;
        self.max_replacements = max;
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    pub fn regex(mut self) -> Self {
        self.matching.regex = true;
        self
    }

    pub fn flexible(mut self) -> Self {
        self.matching.flexible = true;
        self
    }

    pub fn structural(mut self) -> Self {
        self.matching.structural = true;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.matching.case_sensitive = false;
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattened_matching_flags_deserialize() {
        let options: SurgeryOptions =
            serde_json::from_str(r#"{"regex": true, "occurrence": 2, "case_sensitive": false}"#)
                .unwrap();
        assert!(options.matching.regex);
        assert!(!options.matching.case_sensitive);
        assert_eq!(options.occurrence, Some(2));
        assert!(!options.dry_run);
    }

    #[test]
    fn empty_object_gives_defaults() {
        let options: SurgeryOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, SurgeryOptions::default());
        assert!(options.matching.case_sensitive);
    }
}

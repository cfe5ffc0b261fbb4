use crate::snapshot::RetentionPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Environment variable that overrides [`SurgeryConfig::backup_dir`].
pub const BACKUP_DIR_ENV: &str = "FILE_SURGERY_BACKUP_DIR";

/// Settings shared by every operation of a [`Surgeon`](crate::Surgeon).
///
/// ```toml
/// backup_dir = "/var/tmp/surgery-backups"
/// validate_syntax = true
///
/// [retention]
/// keep_backups = true
/// max_per_file = 5
/// max_age_secs = 604800
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurgeryConfig {
    pub backup_dir: PathBuf,
    pub retention: RetentionPolicy,
    /// Run the post-write syntax check.
    pub validate_syntax: bool,
    /// Case sensitivity used when an operation does not specify one.
    pub default_case_sensitive: bool,
}

impl Default for SurgeryConfig {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
            retention: RetentionPolicy::default(),
            validate_syntax: true,
            default_case_sensitive: true,
        }
    }
}

/// `~/.file-surgery/backups`, or a relative `.file-surgery/backups` when the
/// home directory is unknown.
pub fn default_backup_dir() -> PathBuf {
    home::home_dir()
        .map(|home| home.join(".file-surgery").join("backups"))
        .unwrap_or_else(|| PathBuf::from(".file-surgery").join("backups"))
}

impl SurgeryConfig {
    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = dir.into();
        self
    }

    /// Apply `FILE_SURGERY_BACKUP_DIR` if set and non-empty.
    pub fn with_env_overrides(self) -> Self {
        match std::env::var_os(BACKUP_DIR_ENV) {
            Some(dir) if !dir.is_empty() => self.with_backup_dir(dir),
            _ => self,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.backup_dir.as_os_str().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "backup_dir",
            });
        }
        if self.retention.max_per_file == Some(0) {
            issues.push(ValidationIssue::InvalidValue {
                field: "retention.max_per_file",
                message: "must be at least 1; use keep_backups = false to keep none".to_string(),
            });
        }
        if self.retention.max_total_bytes == Some(0) {
            issues.push(ValidationIssue::InvalidValue {
                field: "retention.max_total_bytes",
                message: "must be greater than 0".to_string(),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    MissingField {
        field: &'static str,
    },
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "missing required field '{field}'")
            }
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "invalid value for '{field}': {message}")
            }
        }
    }
}

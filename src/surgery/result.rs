use super::errors::SurgeryError;
use crate::matcher::MatchStrategy;
use crate::operation::OperationType;
use crate::safety::SafetyReport;
use crate::snapshot::Snapshot;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// States of one mutation.
///
/// ```text
/// Idle -> BackedUp -> Matched -> Formatted -> Written -> Verified -> Committed
///                                    any -> Failed -> RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Idle,
    BackedUp,
    Matched,
    Formatted,
    Written,
    Verified,
    Committed,
    Failed,
    RolledBack,
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationState::Committed | OperationState::Failed | OperationState::RolledBack
        )
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationState::Idle => "idle",
            OperationState::BackedUp => "backed_up",
            OperationState::Matched => "matched",
            OperationState::Formatted => "formatted",
            OperationState::Written => "written",
            OperationState::Verified => "verified",
            OperationState::Committed => "committed",
            OperationState::Failed => "failed",
            OperationState::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

/// Report of one operation. Serializes to the JSON emitted by `--json` and
/// by batch runs.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
    pub operation: OperationType,
    pub file: PathBuf,
    pub state: OperationState,
    /// New content on success; the untouched content on failure when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Content before the operation, for diffs. Never serialized.
    #[serde(skip)]
    pub original: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    /// 1-indexed `line:column` of every occurrence found.
    pub locations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
    pub safety: SafetyReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<MatchStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    pub replacements: usize,
    /// Whether a syntax check actually ran.
    pub validated: bool,
    pub dry_run: bool,
}

impl OperationResult {
    pub fn new(operation: OperationType, file: impl Into<PathBuf>) -> Self {
        Self {
            success: false,
            message: String::new(),
            operation,
            file: file.into(),
            state: OperationState::Idle,
            content: None,
            original: None,
            error: None,
            error_kind: None,
            warnings: Vec::new(),
            suggestions: Vec::new(),
            locations: Vec::new(),
            snapshot: None,
            safety: SafetyReport::default(),
            strategy: None,
            engine: None,
            replacements: 0,
            validated: false,
            dry_run: false,
        }
    }

    /// Record a failure. The state is left to the caller.
    pub fn fail(&mut self, error: &SurgeryError) {
        self.success = false;
        self.message = error.to_string();
        self.error = Some(error.to_string());
        self.error_kind = Some(error.kind());
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Downgrade a warning-kind error to a warning; pass anything else back.
    pub fn tolerate(&mut self, error: SurgeryError) -> Result<(), SurgeryError> {
        if !error.is_warning() {
            return Err(error);
        }
        self.warn(error.to_string());
        Ok(())
    }
}

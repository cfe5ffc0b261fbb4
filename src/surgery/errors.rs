use crate::edit::EditError;
use crate::engine::EngineError;
use crate::matcher::MatchError;
use crate::operation::OperationType;
use crate::snapshot::SnapshotError;
use crate::text::TextError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurgeryError {
    #[error("pattern not found: {pattern:?}")]
    PatternNotFound { pattern: String },

    #[error("pattern occurs {count} times; using the first (at {})", .locations.join(", "))]
    AmbiguousPattern { count: usize, locations: Vec<String> },

    #[error("occurrence {requested} requested but the pattern occurs {available} time(s)")]
    OccurrenceOutOfRange { requested: usize, available: usize },

    #[error("encoding detection failed; decoded as {encoding}")]
    EncodingDetectionFailed { encoding: String },

    #[error("snapshot creation failed: {0}")]
    SnapshotCreationFailed(#[source] SnapshotError),

    #[error("write to {path} failed: {message}")]
    WriteFailed { path: PathBuf, message: String },

    #[error("post-write validation failed: {message}")]
    PostWriteValidationFailed { message: String },

    #[error("engine capability mismatch: {0}")]
    EngineCapabilityMismatch(#[from] EngineError),

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] MatchError),

    #[error("{operation} requires a pattern")]
    MissingPattern { operation: OperationType },

    #[error("{operation} is not a file mutation")]
    Unsupported { operation: OperationType },

    #[error("{path} changed on disk since it was read")]
    ConcurrentModification { path: PathBuf },

    #[error("{path} already exists")]
    FileExists { path: PathBuf },

    #[error(transparent)]
    Read(#[from] TextError),

    #[error("edit could not be applied: {0}")]
    Splice(#[from] EditError),
}

impl SurgeryError {
    /// Stable snake_case identifier used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            SurgeryError::PatternNotFound { .. } => "pattern_not_found",
            SurgeryError::AmbiguousPattern { .. } => "ambiguous_pattern",
            SurgeryError::OccurrenceOutOfRange { .. } => "occurrence_out_of_range",
            SurgeryError::EncodingDetectionFailed { .. } => "encoding_detection_failed",
            SurgeryError::SnapshotCreationFailed(_) => "snapshot_creation_failed",
            SurgeryError::WriteFailed { .. } => "write_failed",
            SurgeryError::PostWriteValidationFailed { .. } => "post_write_validation_failed",
            SurgeryError::EngineCapabilityMismatch(_) => "engine_capability_mismatch",
            SurgeryError::InvalidPattern(_) => "invalid_pattern",
            SurgeryError::MissingPattern { .. } => "missing_pattern",
            SurgeryError::Unsupported { .. } => "unsupported",
            SurgeryError::ConcurrentModification { .. } => "concurrent_modification",
            SurgeryError::FileExists { .. } => "file_exists",
            SurgeryError::Read(_) => "read",
            SurgeryError::Splice(_) => "splice",
        }
    }

    /// Warning kinds are reported alongside a successful operation.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            SurgeryError::AmbiguousPattern { .. } | SurgeryError::EncodingDetectionFailed { .. }
        )
    }
}

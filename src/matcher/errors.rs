use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("search pattern is empty")]
    EmptyPattern,

    #[error("invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("invalid structural pattern '{pattern}': {message}")]
    InvalidStructuralPattern { pattern: String, message: String },
}

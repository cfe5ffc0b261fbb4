//! File Surgery: pattern-based file edits with automatic backup and rollback
//!
//! Locate a region of a text file (literal, regex, whitespace-flexible,
//! multiline or ast-grep structural patterns), splice new content in with
//! matching indentation and line endings, and write the result atomically.
//!
//! # Architecture
//!
//! Every mutation runs through [`Surgeon`] as a small state machine:
//! back up, match, format, write, verify, commit. Any failure after the
//! backup restores the file byte-for-byte. All splices compile down to
//! [`Edit`], a verified byte-span replacement.
//!
//! # Safety
//!
//! - Backups are taken before every mutation of an existing file
//! - Atomic file writes (tempfile + fsync + rename)
//! - Source encoding and line endings are preserved
//! - Structural edits are syntax-checked before commit
//! - Replacing a pattern with itself writes nothing
//!
//! # Example
//!
//! ```no_run
//! use file_surgery::{Surgeon, SurgeryConfig};
//! use std::path::Path;
//!
//! let surgeon = Surgeon::new(SurgeryConfig::default());
//! let options = surgeon.default_options().occurrence(2);
//! let result = surgeon.replace(Path::new("src/app.py"), "old_name", "new_name", &options);
//!
//! if result.success {
//!     println!("{} ({} replacement)", result.message, result.replacements);
//! } else {
//!     eprintln!("{}", result.message);
//! }
//! ```

pub mod batch;
pub mod cache;
pub mod config;
pub mod edit;
pub mod engine;
pub mod format;
pub mod lang;
pub mod matcher;
pub mod operation;
pub mod pool;
pub mod position;
pub mod safety;
pub mod snapshot;
pub mod surgery;
pub mod text;
pub mod validate;

// Re-exports
pub use batch::{load_batch, parse_batch, run_batch, BatchError, BatchFormat, BatchReport};
pub use config::{
    load_from_path, load_from_str, resolve, ConfigError, SurgeryConfig,
    ValidationError as ConfigValidationError,
};
pub use edit::{atomic_write, Edit, EditError, EditVerification};
pub use engine::{Capability, Engine, EngineError, EngineRegistry, EngineSelection};
pub use matcher::{MatchError, MatchOptions, MatchResult, MatchStrategy, Matcher};
pub use operation::OperationType;
pub use safety::{SafetyLevel, SafetyReport};
pub use snapshot::{RestoreOutcome, RetentionPolicy, Snapshot, SnapshotError, SnapshotManager};
pub use surgery::{OperationResult, OperationState, Surgeon, SurgeryError, SurgeryOptions};
pub use text::{DecodedText, LineEnding, LineIndex, TextError};
pub use validate::{Checker, ErrorLocation, ValidationError};

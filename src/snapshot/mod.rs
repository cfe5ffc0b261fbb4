//! Pre-mutation backups.
//!
//! Every mutation of an existing file is preceded by a byte-for-byte copy
//! into a flat backup directory. Backup names encode the original file name,
//! the operation and a UTC timestamp with microsecond resolution:
//!
//! ```text
//! {filename}_{operation}_{YYYYMMDD_HHMMSS_ffffff}.backup
//! ```
//!
//! The directory listing is the only index; there is no metadata file.
//! Files with the same name in different directories share a namespace.

pub mod errors;
pub mod manager;
pub mod retention;

pub use errors::SnapshotError;
pub use manager::{RestoreOutcome, SnapshotManager};
pub use retention::RetentionPolicy;

use crate::operation::OperationType;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const BACKUP_EXTENSION: &str = "backup";

/// One backup file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Backup file name without extension.
    pub id: String,
    /// File name of the backed-up file.
    pub source_name: String,
    /// Full source path, known only for snapshots taken in this process.
    pub source_path: Option<PathBuf>,
    pub backup_path: PathBuf,
    pub operation: OperationType,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

impl Snapshot {
    /// Parse a backup path produced by [`SnapshotManager`]. Returns `None`
    /// for anything that does not follow the naming scheme.
    pub fn from_backup_path(path: &Path, size_bytes: u64) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        let caps = name_regex()?.captures(file_name)?;
        let operation = caps["op"].parse::<OperationType>().ok()?;
        let created_at = parse_timestamp(&caps["ts"])?;
        let id = file_name
            .strip_suffix(&format!(".{BACKUP_EXTENSION}"))?
            .to_string();

        Some(Self {
            id,
            source_name: caps["file"].to_string(),
            source_path: None,
            backup_path: path.to_path_buf(),
            operation,
            created_at,
            size_bytes,
        })
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.created_at)
    }
}

fn name_regex() -> Option<&'static Regex> {
    static NAME: OnceLock<Option<Regex>> = OnceLock::new();
    NAME.get_or_init(|| {
        Regex::new(r"^(?P<file>.+)_(?P<op>[a-z-]+)_(?P<ts>\d{8}_\d{6}_\d{6})\.backup$").ok()
    })
    .as_ref()
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    format!(
        "{}_{:06}",
        at.format("%Y%m%d_%H%M%S"),
        at.timestamp_subsec_micros()
    )
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let (seconds, micros) = raw.rsplit_once('_')?;
    let naive = NaiveDateTime::parse_from_str(seconds, "%Y%m%d_%H%M%S").ok()?;
    let micros: i64 = micros.parse().ok()?;
    Some(naive.and_utc() + chrono::Duration::microseconds(micros))
}

pub fn backup_file_name(source_name: &str, operation: OperationType, at: DateTime<Utc>) -> String {
    format!(
        "{source_name}_{}_{}.{BACKUP_EXTENSION}",
        operation.as_str(),
        format_timestamp(at)
    )
}

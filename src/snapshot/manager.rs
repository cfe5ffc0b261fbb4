use super::retention::{plan_by_age, plan_by_count, plan_by_size, RetentionPolicy};
use super::{backup_file_name, Snapshot, SnapshotError, BACKUP_EXTENSION};
use crate::edit::atomic_write;
use crate::operation::OperationType;
use chrono::{DateTime, Utc};
use glob::Pattern;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Creates, lists, restores and prunes backups in one flat directory.
#[derive(Debug)]
pub struct SnapshotManager {
    backup_dir: PathBuf,
    /// Last timestamp handed out, in microseconds since the epoch.
    last_micros: AtomicI64,
}

/// Result of [`SnapshotManager::restore_latest`].
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub restored: Snapshot,
    /// Snapshot of the state that was overwritten, if one was requested.
    pub pre_restore: Option<Snapshot>,
}

impl SnapshotManager {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            last_micros: AtomicI64::new(0),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Strictly increasing timestamp, never behind the wall clock.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_micros();
        let mut prev = self.last_micros.load(Ordering::SeqCst);
        loop {
            let next = now.max(prev + 1);
            match self.last_micros.compare_exchange(
                prev,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return DateTime::from_timestamp_micros(next).unwrap_or_else(Utc::now),
                Err(actual) => prev = actual,
            }
        }
    }

    /// Copy `path` byte-for-byte into the backup directory.
    pub fn create_snapshot(
        &self,
        path: &Path,
        operation: OperationType,
    ) -> Result<Snapshot, SnapshotError> {
        if !path.is_file() {
            return Err(SnapshotError::SourceMissing {
                path: path.to_path_buf(),
            });
        }
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| SnapshotError::SourceMissing {
                path: path.to_path_buf(),
            })?;

        fs::create_dir_all(&self.backup_dir)
            .map_err(|e| SnapshotError::io(&self.backup_dir, e))?;
        let bytes = fs::read(path).map_err(|e| SnapshotError::io(path, e))?;

        // Another process may have used the same microsecond; retry with the
        // next one instead of overwriting its backup.
        let mut attempts = 0;
        let (backup_path, created_at) = loop {
            let created_at = self.next_timestamp();
            let candidate = self
                .backup_dir
                .join(backup_file_name(&source_name, operation, created_at));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(mut file) => {
                    file.write_all(&bytes)
                        .and_then(|_| file.sync_all())
                        .map_err(|e| SnapshotError::io(&candidate, e))?;
                    break (candidate, created_at);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && attempts < 16 => {
                    attempts += 1;
                }
                Err(e) => return Err(SnapshotError::io(&candidate, e)),
            }
        };

        let id = backup_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        debug!(
            source = %path.display(),
            backup = %backup_path.display(),
            bytes = bytes.len(),
            "created snapshot"
        );

        Ok(Snapshot {
            id,
            source_name,
            source_path: Some(path.to_path_buf()),
            backup_path,
            operation,
            created_at,
            size_bytes: bytes.len() as u64,
        })
    }

    /// All snapshots whose original file name matches `file_pattern` (a glob),
    /// newest first. A missing backup directory is an empty listing.
    pub fn list_snapshots(&self, file_pattern: Option<&str>) -> Result<Vec<Snapshot>, SnapshotError> {
        let pattern = file_pattern
            .map(|p| {
                Pattern::new(p).map_err(|e| SnapshotError::InvalidPattern {
                    pattern: p.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()?;

        if !self.backup_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut snapshots = Vec::new();
        for entry in WalkDir::new(&self.backup_dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file()
                || entry.path().extension().and_then(|e| e.to_str()) != Some(BACKUP_EXTENSION)
            {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let Some(snapshot) = Snapshot::from_backup_path(entry.path(), size) else {
                continue;
            };
            if pattern
                .as_ref()
                .is_some_and(|p| !p.matches(&snapshot.source_name))
            {
                continue;
            }
            snapshots.push(snapshot);
        }

        snapshots.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(snapshots)
    }

    /// Snapshots of exactly this file's name, optionally for one operation.
    pub fn snapshots_for(
        &self,
        path: &Path,
        operation: Option<OperationType>,
    ) -> Result<Vec<Snapshot>, SnapshotError> {
        let name = file_name_of(path);
        let mut snapshots = self.list_snapshots(None)?;
        snapshots.retain(|s| s.source_name == name && operation.map_or(true, |op| s.operation == op));
        Ok(snapshots)
    }

    /// Overwrite `path` with the bytes of `snapshot`.
    pub fn restore(&self, snapshot: &Snapshot, path: &Path) -> Result<(), SnapshotError> {
        let bytes =
            fs::read(&snapshot.backup_path).map_err(|e| SnapshotError::io(&snapshot.backup_path, e))?;
        atomic_write(path, &bytes).map_err(|e| SnapshotError::io(path, e))?;
        info!(
            file = %path.display(),
            snapshot = %snapshot.id,
            "restored snapshot"
        );
        Ok(())
    }

    /// Restore the newest snapshot of `path`. With `snapshot_current` the
    /// state being overwritten is backed up first as `pre-restore`.
    pub fn restore_latest(
        &self,
        path: &Path,
        operation: Option<OperationType>,
        snapshot_current: bool,
    ) -> Result<RestoreOutcome, SnapshotError> {
        let latest = self
            .snapshots_for(path, operation)?
            .into_iter()
            .find(|s| s.operation != OperationType::PreRestore || operation.is_some())
            .ok_or_else(|| SnapshotError::NotFound {
                file: file_name_of(path),
            })?;

        let pre_restore = if snapshot_current && path.is_file() {
            Some(self.create_snapshot(path, OperationType::PreRestore)?)
        } else {
            None
        };

        self.restore(&latest, path)?;
        Ok(RestoreOutcome {
            restored: latest,
            pre_restore,
        })
    }

    pub fn delete(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        match fs::remove_file(&snapshot.backup_path) {
            Ok(()) => {
                debug!(snapshot = %snapshot.id, "deleted snapshot");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SnapshotError::io(&snapshot.backup_path, e)),
        }
    }

    fn delete_all(&self, doomed: Vec<Snapshot>) -> Result<Vec<Snapshot>, SnapshotError> {
        let mut removed = Vec::with_capacity(doomed.len());
        for snapshot in doomed {
            if removed.iter().any(|s: &Snapshot| s.id == snapshot.id) {
                continue;
            }
            self.delete(&snapshot)?;
            removed.push(snapshot);
        }
        if !removed.is_empty() {
            info!(count = removed.len(), "pruned snapshots");
        }
        Ok(removed)
    }

    /// Remove snapshots older than `max_age` and all but the `max_count`
    /// newest per file. Running it twice removes nothing the second time.
    pub fn cleanup_old_snapshots(
        &self,
        file_pattern: Option<&str>,
        max_age: Option<Duration>,
        max_count: Option<usize>,
    ) -> Result<Vec<Snapshot>, SnapshotError> {
        let snapshots = self.list_snapshots(file_pattern)?;
        let mut doomed = Vec::new();
        if let Some(max_age) = max_age {
            doomed.extend(plan_by_age(&snapshots, max_age, Utc::now()));
        }
        if let Some(max_count) = max_count {
            doomed.extend(plan_by_count(&snapshots, max_count));
        }
        self.delete_all(doomed)
    }

    /// Remove the oldest snapshots until the total size fits.
    pub fn cleanup_by_size(
        &self,
        file_pattern: Option<&str>,
        max_total_bytes: u64,
    ) -> Result<Vec<Snapshot>, SnapshotError> {
        let snapshots = self.list_snapshots(file_pattern)?;
        self.delete_all(plan_by_size(&snapshots, max_total_bytes))
    }

    /// Prune after a committed operation on `path`. Failures are logged,
    /// never propagated: the mutation itself already succeeded.
    pub fn apply_retention(&self, path: &Path, policy: &RetentionPolicy) -> Vec<Snapshot> {
        let name = glob::Pattern::escape(&file_name_of(path));
        let mut removed = Vec::new();

        match self.cleanup_old_snapshots(Some(&name), policy.max_age(), policy.max_per_file) {
            Ok(r) => removed.extend(r),
            Err(e) => warn!(file = %path.display(), error = %e, "retention cleanup failed"),
        }
        if let Some(max_total) = policy.max_total_bytes {
            match self.cleanup_by_size(None, max_total) {
                Ok(r) => removed.extend(r),
                Err(e) => warn!(error = %e, "size-based cleanup failed"),
            }
        }
        removed
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

//! Retention planning.
//!
//! The planners are pure: they take snapshots sorted newest first and return
//! the ones to delete. [`SnapshotManager`](super::SnapshotManager) performs
//! the deletion.

use super::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// How many backups to keep after a committed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Keep the snapshot of a successful operation. When false it is
    /// deleted right after commit.
    pub keep_backups: bool,
    pub max_per_file: Option<usize>,
    pub max_age_secs: Option<u64>,
    pub max_total_bytes: Option<u64>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep_backups: true,
            max_per_file: Some(10),
            max_age_secs: None,
            max_total_bytes: None,
        }
    }
}

impl RetentionPolicy {
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_secs.map(Duration::from_secs)
    }
}

/// Snapshots beyond the `max_count` newest of each source file.
pub fn plan_by_count(snapshots: &[Snapshot], max_count: usize) -> Vec<Snapshot> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    snapshots
        .iter()
        .filter(|snap| {
            let kept = seen.entry(snap.source_name.clone()).or_insert(0);
            *kept += 1;
            *kept > max_count
        })
        .cloned()
        .collect()
}

/// Snapshots strictly older than `max_age`.
pub fn plan_by_age(snapshots: &[Snapshot], max_age: Duration, now: DateTime<Utc>) -> Vec<Snapshot> {
    let Ok(max_age) = chrono::Duration::from_std(max_age) else {
        return Vec::new();
    };
    snapshots
        .iter()
        .filter(|snap| snap.age(now) > max_age)
        .cloned()
        .collect()
}

/// Oldest snapshots that push the total size over `max_total_bytes`.
pub fn plan_by_size(snapshots: &[Snapshot], max_total_bytes: u64) -> Vec<Snapshot> {
    let mut total = 0u64;
    snapshots
        .iter()
        .filter(|snap| {
            total = total.saturating_add(snap.size_bytes);
            total > max_total_bytes
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationType;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn snap(name: &str, minute: u32, size: u64) -> Snapshot {
        Snapshot {
            id: format!("{name}-{minute}"),
            source_name: name.to_string(),
            source_path: None,
            backup_path: PathBuf::from(format!("{name}-{minute}.backup")),
            operation: OperationType::Replace,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap(),
            size_bytes: size,
        }
    }

    fn newest_first(mut snaps: Vec<Snapshot>) -> Vec<Snapshot> {
        snaps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        snaps
    }

    #[test]
    fn count_is_per_source_file() {
        let snaps = newest_first(vec![
            snap("a.py", 1, 1),
            snap("a.py", 2, 1),
            snap("a.py", 3, 1),
            snap("b.py", 4, 1),
        ]);
        let removed = plan_by_count(&snaps, 2);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, "a.py-1");
    }

    #[test]
    fn age_uses_creation_time() {
        let snaps = newest_first(vec![snap("a.py", 0, 1), snap("a.py", 30, 1)]);
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 40, 0).unwrap();
        let removed = plan_by_age(&snaps, Duration::from_secs(20 * 60), now);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, "a.py-0");
    }

    #[test]
    fn size_drops_oldest_first() {
        let snaps = newest_first(vec![
            snap("a.py", 1, 40),
            snap("b.py", 2, 40),
            snap("c.py", 3, 40),
        ]);
        let removed = plan_by_size(&snaps, 100);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, "a.py-1");
        assert!(plan_by_size(&snaps, 120).is_empty());
    }
}

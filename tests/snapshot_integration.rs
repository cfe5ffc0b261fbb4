//! Backup directory lifecycle: creation, listing, pruning and restore.

use file_surgery::{OperationType, SnapshotManager};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn manager(dir: &TempDir) -> SnapshotManager {
    SnapshotManager::new(dir.path().join("backups"))
}

#[test]
fn cleanup_keeps_most_recent_per_file() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let path = dir.path().join("x.py");

    let mut taken = Vec::new();
    for i in 0..5 {
        fs::write(&path, format!("v = {i}\n")).unwrap();
        taken.push(manager.create_snapshot(&path, OperationType::Replace).unwrap());
    }

    let removed = manager
        .cleanup_old_snapshots(Some("x.py"), None, Some(3))
        .unwrap();
    assert_eq!(removed.len(), 2);

    let remaining = manager.list_snapshots(Some("x.py")).unwrap();
    let remaining_ids: Vec<_> = remaining.iter().map(|s| s.id.clone()).collect();
    let newest: Vec<_> = taken.iter().rev().take(3).map(|s| s.id.clone()).collect();
    assert_eq!(remaining_ids, newest);

    let again = manager
        .cleanup_old_snapshots(Some("x.py"), None, Some(3))
        .unwrap();
    assert!(again.is_empty());
}

#[test]
fn count_limit_applies_per_file() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, "a").unwrap();
    fs::write(&b, "b").unwrap();

    for _ in 0..3 {
        manager.create_snapshot(&a, OperationType::Append).unwrap();
        manager.create_snapshot(&b, OperationType::Append).unwrap();
    }

    manager.cleanup_old_snapshots(None, None, Some(1)).unwrap();

    assert_eq!(manager.list_snapshots(Some("a.txt")).unwrap().len(), 1);
    assert_eq!(manager.list_snapshots(Some("b.txt")).unwrap().len(), 1);
}

#[test]
fn list_filters_by_glob_and_sorts_newest_first() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let py = dir.path().join("app.py");
    let rs = dir.path().join("main.rs");
    fs::write(&py, "x").unwrap();
    fs::write(&rs, "fn main() {}").unwrap();

    let first = manager.create_snapshot(&py, OperationType::Replace).unwrap();
    manager.create_snapshot(&rs, OperationType::Before).unwrap();
    let last = manager.create_snapshot(&py, OperationType::After).unwrap();

    let all = manager.list_snapshots(None).unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let py_only = manager.list_snapshots(Some("*.py")).unwrap();
    assert_eq!(py_only.len(), 2);
    assert_eq!(py_only[0].id, last.id);
    assert_eq!(py_only[1].id, first.id);
    assert_eq!(py_only[0].operation, OperationType::After);
}

#[test]
fn unrelated_files_in_backup_dir_are_ignored() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let path = dir.path().join("x.py");
    fs::write(&path, "x").unwrap();
    manager.create_snapshot(&path, OperationType::Replace).unwrap();

    fs::write(manager.backup_dir().join("notes.txt"), "hi").unwrap();
    fs::write(manager.backup_dir().join("garbage.backup"), "hi").unwrap();

    assert_eq!(manager.list_snapshots(None).unwrap().len(), 1);
}

#[test]
fn size_cleanup_drops_oldest_first() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let path = dir.path().join("big.txt");
    fs::write(&path, vec![b'x'; 100]).unwrap();

    let oldest = manager.create_snapshot(&path, OperationType::Replace).unwrap();
    manager.create_snapshot(&path, OperationType::Replace).unwrap();
    manager.create_snapshot(&path, OperationType::Replace).unwrap();

    let removed = manager.cleanup_by_size(None, 250).unwrap();

    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].id, oldest.id);
    let total: u64 = manager
        .list_snapshots(None)
        .unwrap()
        .iter()
        .map(|s| s.size_bytes)
        .sum();
    assert!(total <= 250);
}

#[test]
fn age_cleanup_with_generous_limit_keeps_everything() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let path = dir.path().join("x.py");
    fs::write(&path, "x").unwrap();
    manager.create_snapshot(&path, OperationType::Replace).unwrap();

    let removed = manager
        .cleanup_old_snapshots(None, Some(Duration::from_secs(3600)), None)
        .unwrap();
    assert!(removed.is_empty());
    assert_eq!(manager.list_snapshots(None).unwrap().len(), 1);
}

#[test]
fn restore_latest_brings_back_content() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let path = dir.path().join("x.py");

    fs::write(&path, "original\n").unwrap();
    manager.create_snapshot(&path, OperationType::Replace).unwrap();
    fs::write(&path, "edited\n").unwrap();

    let outcome = manager.restore_latest(&path, None, true).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "original\n");
    assert_eq!(outcome.restored.operation, OperationType::Replace);
    let pre = outcome.pre_restore.unwrap();
    assert_eq!(pre.operation, OperationType::PreRestore);
    assert_eq!(fs::read_to_string(&pre.backup_path).unwrap(), "edited\n");
}

#[test]
fn restore_without_backups_is_an_error() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let path = dir.path().join("never.txt");
    fs::write(&path, "x").unwrap();

    assert!(manager.restore_latest(&path, None, false).is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), "x");
}

#[test]
fn backup_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let path = dir.path().join("latin.txt");
    let bytes = vec![0x63, 0x61, 0x66, 0xE9, 0x0D, 0x0A];
    fs::write(&path, &bytes).unwrap();

    let snapshot = manager.create_snapshot(&path, OperationType::Append).unwrap();

    assert_eq!(fs::read(&snapshot.backup_path).unwrap(), bytes);
    assert_eq!(snapshot.size_bytes, bytes.len() as u64);
    assert_eq!(snapshot.source_name, "latin.txt");
}

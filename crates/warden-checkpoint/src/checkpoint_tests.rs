use super::*;
use chrono::Utc;
use tempfile::TempDir;
use warden_audit::{LogCategory, LogFilter};
use warden_core::ErrorKind;

fn manager(max_checkpoints: usize) -> (CheckpointManager, TempDir) {
    let retention = RetentionPolicy {
        max_checkpoints,
        ..RetentionPolicy::default()
    };
    (
        CheckpointManager::new(retention, Arc::new(SnapshotStore::new())),
        TempDir::new().unwrap(),
    )
}

fn snapshot(mgr: &CheckpointManager, dir: &TempDir, name: &str) -> SnapshotId {
    mgr.snapshots().capture(&dir.path().join(name)).unwrap().id
}

fn days_ago(days: i64) -> Timestamp {
    Timestamp(
        Utc::now()
            .checked_sub_signed(TimeDelta::days(days))
            .unwrap(),
    )
}

#[test]
fn test_create_auto_single_file() {
    let (mgr, dir) = manager(10);
    let path = dir.path().join("out.txt");
    let snap = snapshot(&mgr, &dir, "out.txt");

    let result = mgr.create_auto(&path, snap);
    assert!(result.is_ok());
    let checkpoint = result.data.unwrap();
    assert!(checkpoint.name.starts_with("checkpoint-"));
    assert_eq!(checkpoint.name.len(), "checkpoint-YYYYMMDD-HHMMSS".len());
    assert_eq!(checkpoint.file_snapshots.get(&path), Some(&snap));
    assert_eq!(mgr.len(), 1);
}

#[test]
fn test_create_with_unknown_snapshot_fails() {
    let (mgr, dir) = manager(10);
    let result = mgr.create_auto(&dir.path().join("x"), SnapshotId::new());
    assert_eq!(result.error_kind(), Some(ErrorKind::ResourceNotFound));
    assert!(mgr.is_empty());
}

#[test]
fn test_count_retention_keeps_most_recent() {
    let (mgr, dir) = manager(50);
    let mut created = Vec::new();
    for i in 0..60 {
        let snap = snapshot(&mgr, &dir, &format!("f{i}"));
        created.push(mgr.create_auto(&dir.path().join(format!("f{i}")), snap).data.unwrap());
    }

    assert_eq!(mgr.len(), 50);
    let kept: Vec<CheckpointId> = mgr.list().iter().map(|c| c.id).collect();
    let expected: Vec<CheckpointId> = created.iter().rev().take(50).map(|c| c.id).collect();
    assert_eq!(kept, expected);

    // snapshots of pruned checkpoints are released
    assert_eq!(mgr.snapshots().len(), 50);
    for old in &created[..10] {
        for id in old.file_snapshots.values() {
            assert!(!mgr.snapshots().contains(id));
        }
    }
}

#[test]
fn test_age_retention_prunes_on_next_create() {
    let (mgr, dir) = manager(50);
    let snap = snapshot(&mgr, &dir, "old");
    let old = mgr
        .create_at(
            "old".into(),
            String::new(),
            BTreeMap::from([(dir.path().join("old"), snap)]),
            days_ago(6),
        )
        .data
        .unwrap();
    assert_eq!(mgr.len(), 1);

    let stale = snapshot(&mgr, &dir, "stale");
    let stale_checkpoint = mgr
        .create_at(
            "stale".into(),
            String::new(),
            BTreeMap::from([(dir.path().join("stale"), stale)]),
            days_ago(8),
        )
        .data
        .unwrap();
    // A checkpoint is never pruned by its own create.
    assert!(mgr.get(&stale_checkpoint.id).is_ok());
    assert!(mgr.snapshots().contains(&stale));

    let fresh = snapshot(&mgr, &dir, "fresh");
    mgr.create_auto(&dir.path().join("fresh"), fresh);
    assert_eq!(mgr.len(), 2);
    assert!(mgr.get(&old.id).is_ok());
    assert!(!mgr.get(&stale_checkpoint.id).is_ok());
    assert!(!mgr.snapshots().contains(&stale));
}

#[test]
fn test_zero_max_age_keeps_the_new_checkpoint() {
    let retention = RetentionPolicy {
        max_age: Duration::ZERO,
        ..RetentionPolicy::default()
    };
    let mgr = CheckpointManager::new(retention, Arc::new(SnapshotStore::new()));
    let dir = TempDir::new().unwrap();

    let first = snapshot(&mgr, &dir, "a");
    let a = mgr
        .create_at(
            "a".into(),
            String::new(),
            BTreeMap::from([(dir.path().join("a"), first)]),
            days_ago(1),
        )
        .data
        .unwrap();
    assert!(mgr.get(&a.id).is_ok());
    assert!(mgr.snapshots().contains(&first));

    let second = snapshot(&mgr, &dir, "b");
    let b = mgr.create_auto(&dir.path().join("b"), second).data.unwrap();
    assert_eq!(mgr.len(), 1);
    assert!(mgr.get(&b.id).is_ok());
    assert!(mgr.snapshots().contains(&second));
    assert!(!mgr.snapshots().contains(&first));
}

#[test]
fn test_list_is_newest_first() {
    let (mgr, dir) = manager(10);
    let a = snapshot(&mgr, &dir, "a");
    let b = snapshot(&mgr, &dir, "b");
    let first = mgr.create_manual("first", "", BTreeMap::from([(dir.path().join("a"), a)]));
    let second = mgr.create_manual("second", "", BTreeMap::from([(dir.path().join("b"), b)]));

    let names: Vec<String> = mgr.list().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["second".to_string(), "first".to_string()]);
    assert!(first.data.unwrap().seq < second.data.unwrap().seq);
}

#[test]
fn test_delete_releases_unshared_snapshots() {
    let (mgr, dir) = manager(10);
    let shared = snapshot(&mgr, &dir, "shared");
    let own = snapshot(&mgr, &dir, "own");
    let a = mgr
        .create_manual(
            "a",
            "",
            BTreeMap::from([
                (dir.path().join("shared"), shared),
                (dir.path().join("own"), own),
            ]),
        )
        .data
        .unwrap();
    mgr.create_manual("b", "", BTreeMap::from([(dir.path().join("shared"), shared)]));

    assert!(mgr.delete(&a.id).is_ok());
    assert!(!mgr.snapshots().contains(&own));
    assert!(mgr.snapshots().contains(&shared));

    let again = mgr.delete(&a.id);
    assert_eq!(again.error_kind(), Some(ErrorKind::ResourceNotFound));
    assert_eq!(mgr.get(&a.id).error_kind(), Some(ErrorKind::ResourceNotFound));
}

#[test]
fn test_capture_checkpoint_snapshots_paths() {
    let (mgr, dir) = manager(10);
    let a = dir.path().join("a.txt");
    std::fs::write(&a, "A").unwrap();
    let b = dir.path().join("b.txt");

    let checkpoint = mgr
        .capture_checkpoint("", "manual", &[a.clone(), b.clone()])
        .data
        .unwrap();
    assert!(checkpoint.name.starts_with("checkpoint-"));
    assert_eq!(checkpoint.file_snapshots.len(), 2);

    let snap_b = mgr.snapshots().get(&checkpoint.file_snapshots[&b]).unwrap();
    assert!(!snap_b.existed);
}

#[test]
fn test_events_are_logged() {
    let logger = OperationLogger::new(100);
    let dir = TempDir::new().unwrap();
    let mgr = CheckpointManager::new(
        RetentionPolicy {
            max_checkpoints: 1,
            ..RetentionPolicy::default()
        },
        Arc::new(SnapshotStore::new()),
    )
    .with_logger(logger.clone());

    for name in ["a", "b"] {
        let snap = snapshot(&mgr, &dir, name);
        mgr.create_auto(&dir.path().join(name), snap);
    }

    let entries = logger.get_filtered_logs(&LogFilter::new().with_category(LogCategory::Checkpoint));
    let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Checkpoint created", "Checkpoint created", "Checkpoint pruned"]
    );
}

use super::*;
use std::collections::BTreeMap;
use tempfile::TempDir;
use warden_audit::{LogFilter, LogStatus};
use warden_core::{ContentHash, ErrorKind};

use crate::checkpoint::RetentionPolicy;
use crate::snapshot::SnapshotStore;

struct Harness {
    engine: RollbackEngine,
    logger: OperationLogger,
    dir: TempDir,
}

fn harness() -> Harness {
    let logger = OperationLogger::new(100);
    let manager = CheckpointManager::new(RetentionPolicy::default(), Arc::new(SnapshotStore::new()))
        .with_logger(logger.clone());
    Harness {
        engine: RollbackEngine::new(Arc::new(manager)).with_logger(logger.clone()),
        logger,
        dir: TempDir::new().unwrap(),
    }
}

impl Harness {
    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn snapshot(&self, name: &str) -> SnapshotId {
        self.engine
            .checkpoints()
            .snapshots()
            .capture(&self.path(name))
            .unwrap()
            .id
    }
}

#[test]
fn test_rollback_snapshot_restores_prior_bytes() {
    let h = harness();
    let path = h.path("a.txt");
    std::fs::write(&path, b"original").unwrap();
    let snap = h.snapshot("a.txt");
    std::fs::write(&path, b"changed").unwrap();

    let result = h.engine.rollback_snapshot(&snap);
    assert!(result.is_ok());
    assert_eq!(result.data.unwrap().action, Some(RestoreAction::Restored));
    assert_eq!(std::fs::read(&path).unwrap(), b"original");
}

#[test]
fn test_rollback_absent_snapshot_deletes_file() {
    let h = harness();
    let snap = h.snapshot("new.txt");
    std::fs::write(h.path("new.txt"), b"created").unwrap();

    let result = h.engine.rollback_snapshot(&snap);
    assert_eq!(result.data.unwrap().action, Some(RestoreAction::Deleted));
    assert!(!h.path("new.txt").exists());
}

#[test]
fn test_snapshot_is_single_use() {
    let h = harness();
    let snap = h.snapshot("x.txt");
    assert!(h.engine.rollback_snapshot(&snap).is_ok());

    let again = h.engine.rollback_snapshot(&snap);
    assert_eq!(again.error_kind(), Some(ErrorKind::ResourceNotFound));
}

#[test]
fn test_rollback_recreates_parent_directories() {
    let h = harness();
    let nested = h.path("deep/dir/file.txt");
    std::fs::create_dir_all(nested.parent().unwrap()).unwrap();
    std::fs::write(&nested, b"keep").unwrap();
    let snap = h.engine.checkpoints().snapshots().capture(&nested).unwrap().id;
    std::fs::remove_dir_all(h.path("deep")).unwrap();

    assert!(h.engine.rollback_file(&nested, &snap).is_ok());
    assert_eq!(std::fs::read(&nested).unwrap(), b"keep");
}

#[test]
fn test_rollback_file_rejects_other_path() {
    let h = harness();
    let snap = h.snapshot("a.txt");
    let result = h.engine.rollback_file(&h.path("b.txt"), &snap);
    assert_eq!(result.error_kind(), Some(ErrorKind::ValidationFailure));
    assert!(h.engine.checkpoints().snapshots().contains(&snap));
}

#[test]
fn test_hash_mismatch_is_internal_error() {
    let h = harness();
    let path = h.path("t.txt");
    let mut tampered = FileSnapshot::absent(&path);
    tampered.existed = true;
    tampered.content = b"tampered".to_vec();
    tampered.hash = ContentHash::hash(b"genuine");
    let id = h.engine.checkpoints().snapshots().insert(tampered).id;

    let result = h.engine.rollback_snapshot(&id);
    assert_eq!(result.error_kind(), Some(ErrorKind::Internal));
    assert!(!result.data.unwrap().success);
    assert!(!path.exists());
}

#[test]
fn test_rollback_to_restores_all_files() {
    let h = harness();
    std::fs::write(h.path("a"), b"A0").unwrap();
    let checkpoint = h
        .engine
        .checkpoints()
        .capture_checkpoint("both", "", &[h.path("a"), h.path("b")])
        .data
        .unwrap();
    std::fs::write(h.path("a"), b"A1").unwrap();
    std::fs::write(h.path("b"), b"B1").unwrap();

    let result = h.engine.rollback_to(&checkpoint.id);
    assert!(result.is_ok());
    let report = result.data.unwrap();
    assert!(report.success);
    assert_eq!(report.files.len(), 2);
    assert_eq!(std::fs::read(h.path("a")).unwrap(), b"A0");
    assert!(!h.path("b").exists());

    let logged = h
        .logger
        .get_filtered_logs(&LogFilter::new().with_status(LogStatus::Success));
    assert_eq!(logged.len(), 1);
}

#[test]
fn test_partial_failure_keeps_restored_files() {
    let h = harness();
    std::fs::write(h.path("a"), b"A0").unwrap();
    let a = h.snapshot("a");
    let b = h.snapshot("b");
    let checkpoint = h
        .engine
        .checkpoints()
        .create_manual(
            "pair",
            "",
            BTreeMap::from([(h.path("a"), a), (h.path("b"), b)]),
        )
        .data
        .unwrap();
    h.engine.checkpoints().snapshots().remove(&b);
    std::fs::write(h.path("a"), b"A1").unwrap();

    let result = h.engine.rollback_to(&checkpoint.id);
    assert!(!result.is_ok());
    assert_eq!(result.error_kind(), Some(ErrorKind::ExecutionFailure));
    let report = result.data.unwrap();
    assert!(!report.success);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(std::fs::read(h.path("a")).unwrap(), b"A0");
}

#[test]
fn test_rollback_unknown_checkpoint() {
    let h = harness();
    let result = h.engine.rollback_to(&CheckpointId::new());
    assert_eq!(result.error_kind(), Some(ErrorKind::ResourceNotFound));
}

#[test]
fn test_preview_does_not_mutate_and_flags_missing() {
    let h = harness();
    std::fs::write(h.path("a"), b"12345").unwrap();
    let checkpoint = h
        .engine
        .checkpoints()
        .capture_checkpoint("p", "", &[h.path("a"), h.path("gone"), h.path("new")])
        .data
        .unwrap();
    let gone = checkpoint.file_snapshots[&h.path("gone")];
    h.engine.checkpoints().snapshots().remove(&gone);
    std::fs::write(h.path("a"), b"changed").unwrap();

    let preview = h.engine.preview_rollback(&checkpoint.id).data.unwrap();
    assert!(!preview.can_rollback);
    assert_eq!(preview.warnings.len(), 1);

    let a = preview.files.iter().find(|f| f.path == h.path("a")).unwrap();
    assert_eq!(a.size, 5);
    assert!(a.available && !a.will_delete);
    let new = preview.files.iter().find(|f| f.path == h.path("new")).unwrap();
    assert!(new.will_delete);
    let missing = preview.files.iter().find(|f| f.path == h.path("gone")).unwrap();
    assert!(!missing.available);

    assert_eq!(std::fs::read(h.path("a")).unwrap(), b"changed");
}

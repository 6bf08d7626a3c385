//! Restoring files from snapshots.
//!
//! Every successfully restored snapshot is removed from the store: a
//! snapshot can be rolled back once. A multi-file rollback reports each file
//! and does not undo files it already restored when a later one fails.

use std::cmp::Reverse;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use warden_audit::OperationLogger;
use warden_core::{OpError, OpResult};

use crate::checkpoint::{CheckpointId, CheckpointManager};
use crate::error::{CheckpointError, CheckpointResult};
use crate::snapshot::{FileSnapshot, SnapshotId};

/// What restoring a snapshot did to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreAction {
    /// Content written back.
    Restored,
    /// File removed because it did not exist before.
    Deleted,
}

/// Outcome for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRollback {
    /// The file.
    pub path: PathBuf,
    /// The snapshot it was restored from.
    pub snapshot_id: SnapshotId,
    /// Whether the restore succeeded.
    pub success: bool,
    /// What was done, on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<RestoreAction>,
    /// Why it failed, on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of rolling back a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackReport {
    /// The checkpoint.
    pub checkpoint_id: CheckpointId,
    /// True only if every file was restored.
    pub success: bool,
    /// Per-file outcomes, in restore order.
    pub files: Vec<FileRollback>,
}

impl RollbackReport {
    /// Number of files that failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.files.iter().filter(|f| !f.success).count()
    }
}

/// Dry-run view of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePreview {
    /// The file.
    pub path: PathBuf,
    /// Its snapshot.
    pub snapshot_id: SnapshotId,
    /// Bytes that would be written.
    pub size: u64,
    /// Whether the file would be deleted.
    pub will_delete: bool,
    /// Whether the snapshot is still live.
    pub available: bool,
}

/// Dry-run view of a checkpoint rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackPreview {
    /// The checkpoint.
    pub checkpoint_id: CheckpointId,
    /// Its name.
    pub name: String,
    /// False if any snapshot is missing.
    pub can_rollback: bool,
    /// Per-file view.
    pub files: Vec<FilePreview>,
    /// One entry per missing snapshot.
    pub warnings: Vec<String>,
}

/// Restores checkpoints and single snapshots.
#[derive(Debug, Clone)]
pub struct RollbackEngine {
    checkpoints: Arc<CheckpointManager>,
    logger: OperationLogger,
}

impl RollbackEngine {
    /// Create an engine over a checkpoint manager and its snapshot store.
    #[must_use]
    pub fn new(checkpoints: Arc<CheckpointManager>) -> Self {
        Self {
            checkpoints,
            logger: OperationLogger::default(),
        }
    }

    /// Record rollbacks in `logger`.
    #[must_use]
    pub fn with_logger(mut self, logger: OperationLogger) -> Self {
        self.logger = logger;
        self
    }

    /// The checkpoint manager.
    #[must_use]
    pub fn checkpoints(&self) -> &Arc<CheckpointManager> {
        &self.checkpoints
    }

    /// Restore every file of a checkpoint, newest snapshot first.
    pub fn rollback_to(&self, id: &CheckpointId) -> OpResult<RollbackReport> {
        let checkpoint = match self.checkpoints.get(id).into_result() {
            Ok(c) => c,
            Err(e) => return OpResult::err(e),
        };
        let store = self.checkpoints.snapshots();

        let mut entries: Vec<(PathBuf, SnapshotId, Option<Arc<FileSnapshot>>)> = checkpoint
            .file_snapshots
            .iter()
            .map(|(path, sid)| (path.clone(), *sid, store.get(sid)))
            .collect();
        entries.sort_by_key(|(_, _, snapshot)| Reverse(snapshot.as_ref().map(|s| s.timestamp)));

        let files: Vec<FileRollback> = entries
            .into_iter()
            .map(|(path, sid, snapshot)| match snapshot {
                Some(snapshot) => self.restore_and_consume(&snapshot),
                None => failure(path, sid, &CheckpointError::SnapshotNotFound(sid)),
            })
            .collect();

        let report = RollbackReport {
            checkpoint_id: checkpoint.id,
            success: files.iter().all(|f| f.success),
            files,
        };
        self.logger.log_rollback(
            &checkpoint.name,
            report.success,
            json!({
                "checkpoint_id": checkpoint.id,
                "files": report.files.len(),
                "failed": report.failed_count(),
            }),
        );

        if report.success {
            info!(checkpoint = %checkpoint.id, files = report.files.len(), "rolled back checkpoint");
            OpResult::ok(report)
        } else {
            let failed = report.failed_count();
            let total = report.files.len();
            warn!(checkpoint = %checkpoint.id, failed, total, "checkpoint rollback incomplete");
            OpResult::failed_with(
                report,
                OpError::execution(format!("{failed} of {total} files failed to restore")),
            )
        }
    }

    /// Restore one file from a snapshot taken of that same file.
    pub fn rollback_file(&self, path: &Path, snapshot_id: &SnapshotId) -> OpResult<FileRollback> {
        let Some(snapshot) = self.checkpoints.snapshots().get(snapshot_id) else {
            return OpResult::err(CheckpointError::SnapshotNotFound(*snapshot_id).into());
        };
        if snapshot.path != path {
            return OpResult::err(
                CheckpointError::PathMismatch {
                    snapshot: *snapshot_id,
                    expected: snapshot.path.clone(),
                    actual: path.to_path_buf(),
                }
                .into(),
            );
        }
        self.rollback_single(&snapshot)
    }

    /// Restore the file a snapshot was taken of.
    pub fn rollback_snapshot(&self, snapshot_id: &SnapshotId) -> OpResult<FileRollback> {
        match self.checkpoints.snapshots().get(snapshot_id) {
            Some(snapshot) => self.rollback_single(&snapshot),
            None => OpResult::err(CheckpointError::SnapshotNotFound(*snapshot_id).into()),
        }
    }

    fn rollback_single(&self, snapshot: &FileSnapshot) -> OpResult<FileRollback> {
        let target = snapshot.path.display().to_string();
        match restore(snapshot) {
            Ok(action) => {
                self.checkpoints.snapshots().remove(&snapshot.id);
                info!(path = %target, snapshot = %snapshot.id, "rolled back file");
                self.logger.log_rollback(
                    &target,
                    true,
                    json!({ "snapshot_id": snapshot.id, "action": action }),
                );
                OpResult::ok(success(snapshot, action))
            },
            Err(e) => {
                warn!(path = %target, snapshot = %snapshot.id, error = %e, "file rollback failed");
                self.logger.log_rollback(
                    &target,
                    false,
                    json!({ "snapshot_id": snapshot.id, "error": e.to_string() }),
                );
                let file = failure(snapshot.path.clone(), snapshot.id, &e);
                OpResult::failed_with(file, e.into())
            },
        }
    }

    fn restore_and_consume(&self, snapshot: &FileSnapshot) -> FileRollback {
        match restore(snapshot) {
            Ok(action) => {
                self.checkpoints.snapshots().remove(&snapshot.id);
                success(snapshot, action)
            },
            Err(e) => {
                warn!(path = %snapshot.path.display(), error = %e, "failed to restore file");
                failure(snapshot.path.clone(), snapshot.id, &e)
            },
        }
    }

    /// Describe what [`rollback_to`](Self::rollback_to) would do without
    /// touching the filesystem.
    pub fn preview_rollback(&self, id: &CheckpointId) -> OpResult<RollbackPreview> {
        let checkpoint = match self.checkpoints.get(id).into_result() {
            Ok(c) => c,
            Err(e) => return OpResult::err(e),
        };
        let store = self.checkpoints.snapshots();
        let mut warnings = Vec::new();
        let files = checkpoint
            .file_snapshots
            .iter()
            .map(|(path, sid)| match store.get(sid) {
                Some(snapshot) => FilePreview {
                    path: path.clone(),
                    snapshot_id: *sid,
                    size: snapshot.size,
                    will_delete: !snapshot.existed,
                    available: true,
                },
                None => {
                    warnings.push(format!("snapshot {sid} for {} is no longer available", path.display()));
                    FilePreview {
                        path: path.clone(),
                        snapshot_id: *sid,
                        size: 0,
                        will_delete: false,
                        available: false,
                    }
                },
            })
            .collect();

        OpResult::ok(RollbackPreview {
            checkpoint_id: checkpoint.id,
            name: checkpoint.name,
            can_rollback: warnings.is_empty(),
            files,
            warnings,
        })
    }
}

fn success(snapshot: &FileSnapshot, action: RestoreAction) -> FileRollback {
    FileRollback {
        path: snapshot.path.clone(),
        snapshot_id: snapshot.id,
        success: true,
        action: Some(action),
        error: None,
    }
}

fn failure(path: PathBuf, snapshot_id: SnapshotId, err: &CheckpointError) -> FileRollback {
    FileRollback {
        path,
        snapshot_id,
        success: false,
        action: None,
        error: Some(err.to_string()),
    }
}

/// Write a snapshot back to disk after verifying its hash.
fn restore(snapshot: &FileSnapshot) -> CheckpointResult<RestoreAction> {
    if !snapshot.verify() {
        return Err(CheckpointError::HashMismatch {
            snapshot: snapshot.id,
            path: snapshot.path.clone(),
        });
    }

    if !snapshot.existed {
        return match std::fs::remove_file(&snapshot.path) {
            Ok(()) => Ok(RestoreAction::Deleted),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(RestoreAction::Deleted),
            Err(source) => Err(CheckpointError::Io {
                context: "failed to remove",
                path: snapshot.path.clone(),
                source,
            }),
        };
    }

    if let Some(parent) = snapshot.path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| CheckpointError::Io {
            context: "failed to create parent of",
            path: snapshot.path.clone(),
            source,
        })?;
    }
    std::fs::write(&snapshot.path, &snapshot.content).map_err(|source| CheckpointError::Io {
        context: "failed to restore",
        path: snapshot.path.clone(),
        source,
    })?;
    Ok(RestoreAction::Restored)
}

#[cfg(test)]
#[path = "rollback_tests.rs"]
mod tests;

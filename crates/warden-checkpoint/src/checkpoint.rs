//! Named, retained groups of snapshots.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_audit::OperationLogger;
use warden_core::{OpResult, Timestamp};

use crate::error::CheckpointError;
use crate::snapshot::{SnapshotId, SnapshotStore};

/// Default maximum number of retained checkpoints.
pub const DEFAULT_MAX_CHECKPOINTS: usize = 50;

/// Default maximum checkpoint age (7 days).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(604_800);

const NAME_FORMAT: &str = "checkpoint-%Y%m%d-%H%M%S";

/// Unique identifier of a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CheckpointId(pub Uuid);

impl CheckpointId {
    /// Create a new random checkpoint ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CheckpointId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ckpt:{}", self.0)
    }
}

/// A restorable point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Identifier.
    pub id: CheckpointId,
    /// Display name, `checkpoint-YYYYMMDD-HHMMSS` (UTC) unless given explicitly.
    pub name: String,
    /// What the checkpoint protects.
    pub description: String,
    /// Creation time.
    pub timestamp: Timestamp,
    /// Creation order; breaks timestamp ties.
    pub seq: u64,
    /// Snapshot per file.
    pub file_snapshots: BTreeMap<PathBuf, SnapshotId>,
}

impl Checkpoint {
    fn order_key(&self) -> (Timestamp, u64) {
        (self.timestamp, self.seq)
    }
}

/// Checkpoint name derived from a timestamp.
#[must_use]
pub fn checkpoint_name(timestamp: &Timestamp) -> String {
    timestamp.as_datetime().format(NAME_FORMAT).to_string()
}

/// Limits applied after every create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum number of checkpoints kept. Treated as at least 1.
    pub max_checkpoints: usize,
    /// Checkpoints older than this are pruned.
    pub max_age: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_checkpoints: DEFAULT_MAX_CHECKPOINTS,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

#[derive(Debug, Default)]
struct CheckpointState {
    checkpoints: HashMap<CheckpointId, Checkpoint>,
    next_seq: u64,
}

/// Creates, retains and deletes checkpoints.
///
/// The checkpoint table is guarded by a single mutex so that creation and
/// retention pruning form one atomic step. Snapshots referenced only by
/// pruned or deleted checkpoints are dropped from the [`SnapshotStore`].
#[derive(Debug)]
pub struct CheckpointManager {
    retention: RetentionPolicy,
    snapshots: Arc<SnapshotStore>,
    logger: OperationLogger,
    state: Mutex<CheckpointState>,
}

impl CheckpointManager {
    /// Create a manager over a snapshot store.
    #[must_use]
    pub fn new(retention: RetentionPolicy, snapshots: Arc<SnapshotStore>) -> Self {
        Self {
            retention,
            snapshots,
            logger: OperationLogger::default(),
            state: Mutex::new(CheckpointState::default()),
        }
    }

    /// Record checkpoint events in `logger`.
    #[must_use]
    pub fn with_logger(mut self, logger: OperationLogger) -> Self {
        self.logger = logger;
        self
    }

    /// The snapshot store backing this manager.
    #[must_use]
    pub fn snapshots(&self) -> &Arc<SnapshotStore> {
        &self.snapshots
    }

    /// The retention limits.
    #[must_use]
    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    fn lock(&self) -> MutexGuard<'_, CheckpointState> {
        self.state.lock().unwrap_or_else(|e| {
            warn!("CheckpointManager lock poisoned, recovering");
            PoisonError::into_inner(e)
        })
    }

    /// Create the automatic checkpoint that precedes a write to `path`.
    pub fn create_auto(&self, path: &Path, snapshot_id: SnapshotId) -> OpResult<Checkpoint> {
        let timestamp = Timestamp::now();
        let mut files = BTreeMap::new();
        files.insert(path.to_path_buf(), snapshot_id);
        self.create_at(
            checkpoint_name(&timestamp),
            format!("before write to {}", path.display()),
            files,
            timestamp,
        )
    }

    /// Create a checkpoint over an explicit set of snapshots.
    ///
    /// Every snapshot must be live in the store.
    pub fn create_manual(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        file_snapshots: BTreeMap<PathBuf, SnapshotId>,
    ) -> OpResult<Checkpoint> {
        self.create_at(
            name.into(),
            description.into(),
            file_snapshots,
            Timestamp::now(),
        )
    }

    /// Snapshot `paths` as they are now and group them in a new checkpoint.
    ///
    /// An empty `name` gets a time-derived one.
    pub fn capture_checkpoint(
        &self,
        name: &str,
        description: &str,
        paths: &[PathBuf],
    ) -> OpResult<Checkpoint> {
        let mut files = BTreeMap::new();
        for path in paths {
            match self.snapshots.capture(path) {
                Ok(snapshot) => {
                    files.insert(path.clone(), snapshot.id);
                },
                Err(e) => {
                    for id in files.values() {
                        self.snapshots.remove(id);
                    }
                    return OpResult::err(e.into());
                },
            }
        }
        let timestamp = Timestamp::now();
        let name = if name.is_empty() {
            checkpoint_name(&timestamp)
        } else {
            name.to_string()
        };
        self.create_at(name, description.to_string(), files, timestamp)
    }

    pub(crate) fn create_at(
        &self,
        name: String,
        description: String,
        file_snapshots: BTreeMap<PathBuf, SnapshotId>,
        timestamp: Timestamp,
    ) -> OpResult<Checkpoint> {
        if let Some(missing) = file_snapshots
            .values()
            .find(|id| !self.snapshots.contains(id))
        {
            return OpResult::err(CheckpointError::SnapshotNotFound(*missing).into());
        }

        let (checkpoint, pruned) = {
            let mut state = self.lock();
            let seq = state.next_seq;
            state.next_seq = seq.saturating_add(1);
            let checkpoint = Checkpoint {
                id: CheckpointId::new(),
                name,
                description,
                timestamp,
                seq,
                file_snapshots,
            };
            state.checkpoints.insert(checkpoint.id, checkpoint.clone());
            let pruned = self.apply_retention(&mut state, checkpoint.id);
            (checkpoint, pruned)
        };

        info!(
            checkpoint = %checkpoint.id,
            name = %checkpoint.name,
            files = checkpoint.file_snapshots.len(),
            "checkpoint created"
        );
        self.logger.log_checkpoint(
            "Checkpoint created",
            &format!("{}: {}", checkpoint.name, checkpoint.description),
            json!({
                "checkpoint_id": checkpoint.id,
                "files": checkpoint.file_snapshots.keys().collect::<Vec<_>>(),
            }),
        );
        for old in &pruned {
            self.logger.log_checkpoint(
                "Checkpoint pruned",
                &format!("{} removed by retention", old.name),
                json!({ "checkpoint_id": old.id }),
            );
        }
        OpResult::ok(checkpoint)
    }

    /// Prune by age, then by count. Runs under the state lock. `keep` is the
    /// checkpoint just created and is never pruned by its own create.
    fn apply_retention(&self, state: &mut CheckpointState, keep: CheckpointId) -> Vec<Checkpoint> {
        let now = Timestamp::now();
        let max_age = TimeDelta::from_std(self.retention.max_age).unwrap_or(TimeDelta::MAX);
        let expired: Vec<CheckpointId> = state
            .checkpoints
            .values()
            .filter(|c| c.id != keep && c.timestamp.is_older_than(max_age, now.0))
            .map(|c| c.id)
            .collect();
        let mut removed: Vec<Checkpoint> = expired
            .iter()
            .filter_map(|id| state.checkpoints.remove(id))
            .collect();

        let max = self.retention.max_checkpoints.max(1);
        let excess = state.checkpoints.len().saturating_sub(max);
        if excess > 0 {
            let mut by_age: Vec<((Timestamp, u64), CheckpointId)> = state
                .checkpoints
                .values()
                .filter(|c| c.id != keep)
                .map(|c| (c.order_key(), c.id))
                .collect();
            by_age.sort();
            for (_, id) in by_age.into_iter().take(excess) {
                removed.extend(state.checkpoints.remove(&id));
            }
        }

        if !removed.is_empty() {
            debug!(count = removed.len(), "pruned checkpoints");
            self.release_snapshots(state, &removed);
        }
        removed
    }

    /// Drop snapshots no remaining checkpoint refers to.
    fn release_snapshots(&self, state: &CheckpointState, removed: &[Checkpoint]) {
        let referenced: HashSet<SnapshotId> = state
            .checkpoints
            .values()
            .flat_map(|c| c.file_snapshots.values().copied())
            .collect();
        for id in removed.iter().flat_map(|c| c.file_snapshots.values()) {
            if !referenced.contains(id) {
                self.snapshots.remove(id);
            }
        }
    }

    /// All checkpoints, newest first.
    #[must_use]
    pub fn list(&self) -> Vec<Checkpoint> {
        let mut list: Vec<Checkpoint> = self.lock().checkpoints.values().cloned().collect();
        list.sort_by(|a, b| b.order_key().cmp(&a.order_key()));
        list
    }

    /// Look up a checkpoint.
    pub fn get(&self, id: &CheckpointId) -> OpResult<Checkpoint> {
        match self.lock().checkpoints.get(id) {
            Some(c) => OpResult::ok(c.clone()),
            None => OpResult::err(CheckpointError::CheckpointNotFound(*id).into()),
        }
    }

    /// Delete a checkpoint, releasing snapshots only it referenced.
    pub fn delete(&self, id: &CheckpointId) -> OpResult<Checkpoint> {
        let removed = {
            let mut state = self.lock();
            let Some(checkpoint) = state.checkpoints.remove(id) else {
                return OpResult::err(CheckpointError::CheckpointNotFound(*id).into());
            };
            self.release_snapshots(&state, std::slice::from_ref(&checkpoint));
            checkpoint
        };
        debug!(checkpoint = %removed.id, "checkpoint deleted");
        self.logger.log_checkpoint(
            "Checkpoint deleted",
            &removed.name,
            json!({ "checkpoint_id": removed.id }),
        );
        OpResult::ok(removed)
    }

    /// Number of retained checkpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().checkpoints.len()
    }

    /// Whether no checkpoints are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;

//! Warden Checkpoint - snapshots, checkpoints and rollback.
//!
//! Every mutating write is preceded by a [`FileSnapshot`] held in a
//! [`SnapshotStore`] and grouped into a [`Checkpoint`] by the
//! [`CheckpointManager`]. The [`RollbackEngine`] restores files from those
//! snapshots, either one at a time or a whole checkpoint at once.
//!
//! All state is process-lifetime only.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use warden_checkpoint::{CheckpointManager, RetentionPolicy, RollbackEngine, SnapshotStore};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("notes.md");
//! std::fs::write(&path, "v1").unwrap();
//!
//! let manager = Arc::new(CheckpointManager::new(
//!     RetentionPolicy::default(),
//!     Arc::new(SnapshotStore::new()),
//! ));
//! let checkpoint = manager.capture_checkpoint("", "before edit", &[path.clone()]);
//! std::fs::write(&path, "v2").unwrap();
//!
//! let rollback = RollbackEngine::new(Arc::clone(&manager));
//! let id = checkpoint.data.unwrap().id;
//! assert!(rollback.rollback_to(&id).is_ok());
//! assert_eq!(std::fs::read_to_string(&path).unwrap(), "v1");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod checkpoint;
pub mod error;
pub mod rollback;
pub mod snapshot;

pub use checkpoint::{
    Checkpoint, CheckpointId, CheckpointManager, DEFAULT_MAX_AGE, DEFAULT_MAX_CHECKPOINTS,
    RetentionPolicy, checkpoint_name,
};
pub use error::{CheckpointError, CheckpointResult};
pub use rollback::{
    FilePreview, FileRollback, RestoreAction, RollbackEngine, RollbackPreview, RollbackReport,
};
pub use snapshot::{FileSnapshot, SnapshotId, SnapshotInfo, SnapshotStore};

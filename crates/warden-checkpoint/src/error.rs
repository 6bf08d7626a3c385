//! Checkpoint error types.

use std::path::PathBuf;

use thiserror::Error;
use warden_core::{ErrorKind, OpError};

use crate::checkpoint::CheckpointId;
use crate::snapshot::SnapshotId;

/// Errors from snapshot, checkpoint and rollback operations.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// No live snapshot with this ID.
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(SnapshotId),

    /// No checkpoint with this ID.
    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(CheckpointId),

    /// A snapshot was asked to restore a path it was not taken from.
    #[error("snapshot {snapshot} was taken of {}, not {}", .expected.display(), .actual.display())]
    PathMismatch {
        /// The snapshot.
        snapshot: SnapshotId,
        /// The path it was taken of.
        expected: PathBuf,
        /// The path it was asked to restore.
        actual: PathBuf,
    },

    /// Stored content no longer matches its hash.
    #[error("snapshot {snapshot} of {} failed hash verification", .path.display())]
    HashMismatch {
        /// The snapshot.
        snapshot: SnapshotId,
        /// The path it was taken of.
        path: PathBuf,
    },

    /// Filesystem failure.
    #[error("{context} {}: {source}", .path.display())]
    Io {
        /// What was being attempted.
        context: &'static str,
        /// The file involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl CheckpointError {
    /// The taxonomy kind for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SnapshotNotFound(_) | Self::CheckpointNotFound(_) => ErrorKind::ResourceNotFound,
            Self::PathMismatch { .. } => ErrorKind::ValidationFailure,
            Self::HashMismatch { .. } => ErrorKind::Internal,
            Self::Io { source, .. } => match source.kind() {
                std::io::ErrorKind::NotFound => ErrorKind::ResourceNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
                _ => ErrorKind::ExecutionFailure,
            },
        }
    }
}

impl From<CheckpointError> for OpError {
    fn from(err: CheckpointError) -> Self {
        OpError::new(err.kind(), err.to_string())
    }
}

/// Result type for checkpoint operations.
pub type CheckpointResult<T> = Result<T, CheckpointError>;

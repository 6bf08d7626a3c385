//! Executor error types.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use warden_checkpoint::CheckpointError;
use warden_core::{ErrorKind, OpError};
use warden_workspace::Violation;

/// Errors raised inside the executor before they are folded into an
/// [`OpResult`](warden_core::OpResult).
#[derive(Debug, Error)]
pub enum ToolError {
    /// No policy entry exists for the tool.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A required argument is missing or has the wrong type.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// A sandbox constraint was violated.
    #[error(transparent)]
    Sandbox(#[from] Violation),

    /// The command contains a shell metacharacter or traversal sequence.
    #[error("command rejected: contains {name} '{pattern}'")]
    DangerousCommand {
        /// The matched sequence.
        pattern: &'static str,
        /// What the sequence is.
        name: &'static str,
    },

    /// The command line is blank.
    #[error("command is empty")]
    EmptyCommand,

    /// The binary is not on the allowlist.
    #[error("binary '{0}' is not in the allowed binaries")]
    BinaryNotAllowed(String),

    /// The process could not be spawned.
    #[error("failed to spawn '{binary}': {source}")]
    Spawn {
        /// The binary.
        binary: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The process ran past its deadline and was killed.
    #[error("command timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The process exited unsuccessfully.
    #[error("command exited with {0}")]
    NonZeroExit(String),

    /// File I/O failed.
    #[error("{context} {}: {source}", .path.display())]
    Io {
        /// What was being attempted.
        context: &'static str,
        /// The file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Snapshot or checkpoint bookkeeping failed.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// A collaborator returned a structured failure.
    #[error("{}", .0.message)]
    Operation(OpError),
}

impl ToolError {
    /// The taxonomy kind for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTool(_) | Self::BinaryNotAllowed(_) => ErrorKind::PolicyViolation,
            Self::Sandbox(v) if v.is_validation() => ErrorKind::ValidationFailure,
            Self::Sandbox(_) => ErrorKind::PolicyViolation,
            Self::InvalidArguments(_) | Self::DangerousCommand { .. } | Self::EmptyCommand => {
                ErrorKind::ValidationFailure
            },
            Self::Spawn { .. } | Self::NonZeroExit(_) => ErrorKind::ExecutionFailure,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Io { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => ErrorKind::ResourceNotFound,
                io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
                _ => ErrorKind::ExecutionFailure,
            },
            Self::Checkpoint(e) => e.kind(),
            Self::Operation(e) => e.kind,
        }
    }
}

impl From<ToolError> for OpError {
    fn from(err: ToolError) -> Self {
        OpError::new(err.kind(), err.to_string())
    }
}

/// Result type for executor internals.
pub type ToolResult<T> = Result<T, ToolError>;

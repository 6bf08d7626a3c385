//! The sandboxed operation executor.
//!
//! Every operation re-checks its tool's sandbox constraints even though the
//! approval layer already has, so the executor is safe to call directly.
//! Writes are paired with a snapshot and an automatic checkpoint created
//! before the file is touched; a failed write removes both again.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use warden_checkpoint::{
    CheckpointId, CheckpointManager, FileRollback, RollbackEngine, RollbackReport, SnapshotId,
};
use warden_core::{OpError, OpResult, PolicyStore, ToolPermissionConfig};
use warden_workspace::{check_path, check_size, check_url};

use crate::command::{self, CommandOutput};
use crate::error::{ToolError, ToolResult};

/// Policy entry consulted by [`OperationExecutor::read_file`].
pub const READ_FILE_TOOL: &str = "sandbox_read_file";
/// Policy entry consulted by [`OperationExecutor::write_file`].
pub const WRITE_FILE_TOOL: &str = "sandbox_write_file";
/// Policy entry consulted by [`OperationExecutor::execute_command`].
pub const EXECUTE_COMMAND_TOOL: &str = "sandbox_execute_command";

/// Default wall-clock limit for a command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);
/// Default cap on each captured output stream.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1_048_576;

/// Executor limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Base for relative paths and working directory of commands.
    pub workspace_root: PathBuf,
    /// Commands running longer are killed.
    pub command_timeout: Duration,
    /// When set, only these binaries may be spawned.
    pub allowed_binaries: Option<Vec<String>>,
    /// Cap on each captured output stream.
    pub max_output_bytes: usize,
}

impl ExecutorConfig {
    /// Defaults rooted at `workspace_root`.
    #[must_use]
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            allowed_binaries: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    /// Set the command timeout.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Restrict spawnable binaries.
    #[must_use]
    pub fn with_allowed_binaries(mut self, binaries: Vec<String>) -> Self {
        self.allowed_binaries = Some(binaries);
        self
    }

    /// Set the output cap.
    #[must_use]
    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }
}

/// Content returned by [`OperationExecutor::read_file`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    /// Canonical path read.
    pub path: PathBuf,
    /// File content; invalid UTF-8 is replaced.
    pub content: String,
    /// Size in bytes.
    pub size: u64,
}

/// Outcome of [`OperationExecutor::write_file`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    /// Canonical path written.
    pub path: PathBuf,
    /// Bytes written.
    pub bytes_written: u64,
    /// Snapshot of the prior content.
    pub snapshot_id: SnapshotId,
    /// Automatic checkpoint holding the snapshot.
    pub checkpoint_id: CheckpointId,
}

/// Performs sandboxed file and process operations.
#[derive(Debug)]
pub struct OperationExecutor {
    policy: PolicyStore,
    config: ExecutorConfig,
    rollback: RollbackEngine,
    write_lock: Mutex<()>,
}

impl OperationExecutor {
    /// Create an executor. Writes are checkpointed through `rollback`'s
    /// checkpoint manager.
    #[must_use]
    pub fn new(policy: PolicyStore, config: ExecutorConfig, rollback: RollbackEngine) -> Self {
        Self {
            policy,
            config,
            rollback,
            write_lock: Mutex::new(()),
        }
    }

    /// The executor limits.
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// The checkpoint manager writes are recorded in.
    #[must_use]
    pub fn checkpoints(&self) -> &Arc<CheckpointManager> {
        self.rollback.checkpoints()
    }

    fn tool_policy(&self, tool: &str) -> ToolResult<Arc<ToolPermissionConfig>> {
        self.policy
            .get(tool)
            .ok_or_else(|| ToolError::UnknownTool(tool.to_string()))
    }

    /// Canonicalize `raw` and check it against `tool`'s allowed paths.
    ///
    /// # Errors
    ///
    /// Fails if the tool has no policy or the path is not allowed.
    pub fn authorize_path(&self, tool: &str, raw: &str) -> ToolResult<PathBuf> {
        let policy = self.tool_policy(tool)?;
        Ok(check_path(
            &policy.sandbox_constraints,
            raw,
            &self.config.workspace_root,
        )?)
    }

    /// Check a URL against `tool`'s allowed URLs.
    ///
    /// # Errors
    ///
    /// Fails if the tool has no policy or the URL is not allowed.
    pub fn authorize_url(&self, tool: &str, raw: &str) -> ToolResult<String> {
        let policy = self.tool_policy(tool)?;
        Ok(check_url(&policy.sandbox_constraints, raw)?)
    }

    /// Read a file inside the read policy's allowed paths.
    ///
    /// Blocking; async callers go through [`ReadFileTool`](crate::ReadFileTool),
    /// which runs it on the blocking pool.
    pub fn read_file(&self, path: &str) -> OpResult<FileContent> {
        self.try_read(path).map_err(OpError::from).into()
    }

    fn try_read(&self, raw: &str) -> ToolResult<FileContent> {
        let path = self.authorize_path(READ_FILE_TOOL, raw)?;
        let bytes = std::fs::read(&path).map_err(|source| ToolError::Io {
            context: "failed to read",
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), size = bytes.len(), "read file");
        Ok(FileContent {
            size: bytes.len() as u64,
            content: String::from_utf8_lossy(&bytes).into_owned(),
            path,
        })
    }

    /// Write a file inside the write policy's allowed paths.
    ///
    /// The prior content is snapshotted and checkpointed first. If the write
    /// fails the checkpoint and snapshot are deleted before returning.
    ///
    /// Blocking, and serialized with rollbacks by an internal lock. Async
    /// callers go through [`WriteFileTool`](crate::WriteFileTool).
    pub fn write_file(&self, path: &str, content: &str) -> OpResult<WriteOutcome> {
        self.try_write(path, content).map_err(OpError::from).into()
    }

    fn try_write(&self, raw: &str, content: &str) -> ToolResult<WriteOutcome> {
        let policy = self.tool_policy(WRITE_FILE_TOOL)?;
        let path = check_path(
            &policy.sandbox_constraints,
            raw,
            &self.config.workspace_root,
        )?;
        check_size(&policy.sandbox_constraints, content.len())?;

        // Held across snapshot, checkpoint, write and cleanup.
        let _guard = self.write_lock.lock().unwrap_or_else(|e| {
            warn!("OperationExecutor write lock poisoned, recovering");
            PoisonError::into_inner(e)
        });

        let checkpoints = self.checkpoints();
        let snapshot = checkpoints.snapshots().capture(&path)?;
        let checkpoint = match checkpoints.create_auto(&path, snapshot.id).into_result() {
            Ok(c) => c,
            Err(e) => {
                checkpoints.snapshots().remove(&snapshot.id);
                return Err(ToolError::Operation(e));
            },
        };

        if let Err(source) = write_with_parents(&path, content.as_bytes()) {
            warn!(path = %path.display(), error = %source, "write failed, discarding checkpoint");
            if checkpoints.delete(&checkpoint.id).error.is_some() {
                warn!(checkpoint = %checkpoint.id, "checkpoint already gone during cleanup");
            }
            checkpoints.snapshots().remove(&snapshot.id);
            return Err(ToolError::Io {
                context: "failed to write",
                path,
                source,
            });
        }

        info!(
            path = %path.display(),
            bytes = content.len(),
            checkpoint = %checkpoint.id,
            "wrote file"
        );
        Ok(WriteOutcome {
            path,
            bytes_written: content.len() as u64,
            snapshot_id: snapshot.id,
            checkpoint_id: checkpoint.id,
        })
    }

    /// Screen and run a command without a shell.
    ///
    /// A nonzero exit is a failure that still carries the captured output.
    pub async fn execute_command(&self, command: &str) -> OpResult<CommandOutput> {
        if let Err(e) = self.tool_policy(EXECUTE_COMMAND_TOOL) {
            return OpResult::err(e.into());
        }
        let parsed = match command::parse(command, self.config.allowed_binaries.as_deref()) {
            Ok(p) => p,
            Err(e) => {
                warn!(command, error = %e, "command rejected");
                return OpResult::err(e.into());
            },
        };

        let result = command::run(
            command,
            &parsed,
            &self.config.workspace_root,
            self.config.command_timeout,
            self.config.max_output_bytes,
        )
        .await;

        match result {
            Ok(output) if output.succeeded() => OpResult::ok(output),
            Ok(output) => {
                let status = output
                    .exit_code
                    .map_or_else(|| "a signal".to_string(), |c| format!("code {c}"));
                OpResult::failed_with(output, ToolError::NonZeroExit(status).into())
            },
            Err(e) => OpResult::err(e.into()),
        }
    }

    /// Restore the file a snapshot was taken of. The snapshot is consumed.
    pub fn rollback(&self, snapshot_id: &SnapshotId) -> OpResult<FileRollback> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.rollback.rollback_snapshot(snapshot_id)
    }

    /// Restore every file of a checkpoint, serialized with writes.
    pub fn rollback_checkpoint(&self, id: &CheckpointId) -> OpResult<RollbackReport> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.rollback.rollback_to(id)
    }

    /// The rollback engine.
    #[must_use]
    pub fn rollback_engine(&self) -> &RollbackEngine {
        &self.rollback
    }
}

fn write_with_parents(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

//! The dispatcher: one entry point from a tool call to its outcome.
//!
//! A call is evaluated by the [`ApprovalEngine`]; if approved, it is routed
//! to the matching [`BuiltinTool`](warden_tools::BuiltinTool) and the result
//! is recorded in the [`OperationLogger`]. Checkpoint and rollback
//! operations are exposed alongside so a frontend has a single handle.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use warden_approval::{ApprovalDecision, ApprovalEngine, ApprovalPreferences};
use warden_audit::OperationLogger;
use warden_checkpoint::{
    Checkpoint, CheckpointId, CheckpointManager, FileRollback, RetentionPolicy, RollbackEngine,
    RollbackPreview, RollbackReport, SnapshotId, SnapshotStore,
};
use warden_config::Config;
use warden_core::{OpError, OpResult, PolicyStore, ToolCallRequest};
use warden_tools::{
    AutomationBackend, ExecutorConfig, OperationExecutor, ToolContext, ToolRegistry,
    WRITE_FILE_TOOL,
};

use crate::config_bridge;
use crate::error::{RuntimeError, RuntimeResult};

/// What happened to one tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// The approval decision.
    pub decision: ApprovalDecision,
    /// The execution result; absent when the call was denied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<OpResult<Value>>,
    /// Time spent executing, zero when denied.
    pub duration: Duration,
}

impl DispatchOutcome {
    /// Whether the call was approved and executed successfully.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.result.as_ref().is_some_and(OpResult::is_ok)
    }
}

/// Settings for assembling a [`Dispatcher`] by hand.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Approval preferences.
    pub preferences: ApprovalPreferences,
    /// Checkpoint retention.
    pub retention: RetentionPolicy,
    /// Executor limits; its `workspace_root` is used by every component.
    pub executor: ExecutorConfig,
    /// Audit log capacity.
    pub audit_capacity: usize,
}

impl DispatcherConfig {
    /// Defaults rooted at `workspace_root`.
    #[must_use]
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            preferences: ApprovalPreferences::default(),
            retention: RetentionPolicy::default(),
            executor: ExecutorConfig::new(workspace_root),
            audit_capacity: 1000,
        }
    }
}

/// Owns every mediation component and routes tool calls through them.
pub struct Dispatcher {
    logger: OperationLogger,
    approval: Arc<ApprovalEngine>,
    executor: Arc<OperationExecutor>,
    registry: ToolRegistry,
    context: ToolContext,
}

impl Dispatcher {
    /// Assemble from a policy and explicit settings.
    #[must_use]
    pub fn new(policy: PolicyStore, config: DispatcherConfig) -> Self {
        let logger = OperationLogger::new(config.audit_capacity);
        let root = config.executor.workspace_root.clone();

        let checkpoints = Arc::new(
            CheckpointManager::new(config.retention, Arc::new(SnapshotStore::new()))
                .with_logger(logger.clone()),
        );
        let rollback = RollbackEngine::new(checkpoints).with_logger(logger.clone());
        let executor = Arc::new(OperationExecutor::new(
            policy.clone(),
            config.executor,
            rollback,
        ));
        let approval = Arc::new(ApprovalEngine::new(
            policy,
            logger.clone(),
            config.preferences,
            root,
        ));

        Self {
            context: ToolContext::new(Arc::clone(&executor)),
            logger,
            approval,
            executor,
            registry: ToolRegistry::with_defaults(),
        }
    }

    /// Assemble from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidWorkspace`] if `workspace_root` cannot
    /// be resolved.
    pub fn from_config(config: &Config, workspace_root: &Path) -> RuntimeResult<Self> {
        let root = workspace_root
            .canonicalize()
            .map_err(|source| RuntimeError::InvalidWorkspace {
                path: workspace_root.to_path_buf(),
                source,
            })?;
        let policy = config.policy_store(&root);
        info!(
            workspace = %root.display(),
            tools = policy.len(),
            "dispatcher configured"
        );
        let settings = DispatcherConfig {
            preferences: config_bridge::to_approval_preferences(config),
            retention: config_bridge::to_retention_policy(config),
            executor: config_bridge::to_executor_config(config, &root),
            audit_capacity: config.audit.capacity,
        };
        Ok(Self::new(policy, settings))
    }

    /// Load configuration for `workspace_root` and assemble from it.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ConfigError`] if configuration fails to load
    /// and [`RuntimeError::InvalidWorkspace`] if the root cannot be resolved.
    pub fn load(workspace_root: &Path) -> RuntimeResult<Self> {
        let resolved = Config::load(Some(workspace_root))?;
        Self::from_config(&resolved.config, workspace_root)
    }

    /// Route browser calls to `backend`.
    #[must_use]
    pub fn with_automation(mut self, backend: Arc<dyn AutomationBackend>) -> Self {
        self.context = self.context.with_automation(backend);
        self
    }

    /// Replace the tool registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Evaluate a call and, if approved, execute it.
    pub async fn dispatch(&self, request: ToolCallRequest) -> DispatchOutcome {
        let decision = self.approval.evaluate(&request).await;
        if !decision.approved {
            debug!(tool = %request.tool, reason = %decision.reason, "call not executed");
            return DispatchOutcome {
                decision,
                result: None,
                duration: Duration::ZERO,
            };
        }

        let tool = request.tool.as_str();
        self.logger.log_tool_start(tool, &request.params);
        let started = Instant::now();

        let result = match self.registry.get(tool) {
            Some(handler) => handler.execute(request.params.clone(), &self.context).await,
            None => OpResult::err(OpError::execution(format!(
                "no handler registered for tool {tool}"
            ))),
        };
        let duration = started.elapsed();

        match &result.error {
            None => {
                self.logger.log_tool_success(tool, duration, result.data.clone());
            },
            Some(err) => {
                warn!(tool, kind = %err.kind, detail = %err.message, "tool call failed");
                self.logger.log_tool_error(tool, &err.to_string(), Some(duration));
            },
        }

        DispatchOutcome {
            decision,
            result: Some(result),
            duration,
        }
    }

    /// Restore every file of a checkpoint.
    pub fn rollback_to(&self, id: &CheckpointId) -> OpResult<RollbackReport> {
        self.executor.rollback_checkpoint(id)
    }

    /// Describe a checkpoint rollback without performing it.
    pub fn preview_rollback(&self, id: &CheckpointId) -> OpResult<RollbackPreview> {
        self.executor.rollback_engine().preview_rollback(id)
    }

    /// Restore one snapshot.
    pub fn rollback_snapshot(&self, id: &SnapshotId) -> OpResult<FileRollback> {
        self.executor.rollback(id)
    }

    /// Checkpoint files as they are now. Every path must be writable under
    /// the write policy, since rolling back writes to it.
    pub fn create_checkpoint(
        &self,
        name: &str,
        description: &str,
        paths: &[String],
    ) -> OpResult<Checkpoint> {
        let mut resolved = Vec::with_capacity(paths.len());
        for raw in paths {
            match self.executor.authorize_path(WRITE_FILE_TOOL, raw) {
                Ok(p) => resolved.push(p),
                Err(e) => return OpResult::err(e.into()),
            }
        }
        self.executor
            .checkpoints()
            .capture_checkpoint(name, description, &resolved)
    }

    /// Retained checkpoints, newest first.
    #[must_use]
    pub fn list_checkpoints(&self) -> Vec<Checkpoint> {
        self.executor.checkpoints().list()
    }

    /// Delete a checkpoint.
    pub fn delete_checkpoint(&self, id: &CheckpointId) -> OpResult<Checkpoint> {
        self.executor.checkpoints().delete(id)
    }

    /// The audit log.
    #[must_use]
    pub fn logger(&self) -> &OperationLogger {
        &self.logger
    }

    /// The approval engine.
    #[must_use]
    pub fn approval(&self) -> &Arc<ApprovalEngine> {
        &self.approval
    }

    /// The executor.
    #[must_use]
    pub fn executor(&self) -> &Arc<OperationExecutor> {
        &self.executor
    }

    /// The policy in force.
    #[must_use]
    pub fn policy(&self) -> &PolicyStore {
        self.approval.policy()
    }

    /// The tool registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The workspace root.
    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        self.approval.workspace_root()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("workspace_root", &self.workspace_root())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

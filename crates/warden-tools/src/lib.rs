//! Warden Tools - sandboxed execution of approved tool calls.
//!
//! The [`OperationExecutor`] performs the side effects that the approval
//! layer has allowed: reading and writing files inside a tool's allowed
//! paths, and running commands without a shell. Every write is checkpointed
//! before it happens.
//!
//! The [`ToolRegistry`] maps tool names to [`BuiltinTool`] handlers: the
//! three sandbox tools plus one [`BrowserTool`] per browser action, which
//! forward to an [`AutomationBackend`] supplied by the embedding application.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod automation;
mod browser;
pub mod command;
pub mod error;
pub mod executor;
mod sandbox;
pub mod truncate;

pub use automation::{AutomationBackend, NoopAutomation};
pub use browser::{BrowserAction, BrowserTool};
pub use command::{CommandOutput, DANGEROUS_PATTERNS};
pub use error::{ToolError, ToolResult};
pub use executor::{
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_MAX_OUTPUT_BYTES, EXECUTE_COMMAND_TOOL, ExecutorConfig,
    FileContent, OperationExecutor, READ_FILE_TOOL, WRITE_FILE_TOOL, WriteOutcome,
};
pub use sandbox::{ExecuteCommandTool, ReadFileTool, WriteFileTool};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use warden_core::OpResult;

/// A tool handler that runs in-process once a call is approved.
#[async_trait::async_trait]
pub trait BuiltinTool: Send + Sync {
    /// Tool name, matching its policy entry.
    fn name(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// JSON schema for the call parameters.
    fn input_schema(&self) -> Value;

    /// Perform the call.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> OpResult<Value>;
}

/// Shared collaborators available to every built-in tool.
#[derive(Clone)]
pub struct ToolContext {
    /// The sandboxed executor.
    pub executor: Arc<OperationExecutor>,
    /// Browser driver.
    pub automation: Arc<dyn AutomationBackend>,
}

impl ToolContext {
    /// Context with no automation backend.
    #[must_use]
    pub fn new(executor: Arc<OperationExecutor>) -> Self {
        Self {
            executor,
            automation: Arc::new(NoopAutomation),
        }
    }

    /// Route browser calls to `backend`.
    #[must_use]
    pub fn with_automation(mut self, backend: Arc<dyn AutomationBackend>) -> Self {
        self.automation = backend;
        self
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

/// Name, description and schema of a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Parameter schema.
    pub input_schema: Value,
}

/// Registry of built-in tools by name.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn BuiltinTool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Create a registry with the sandbox and browser tools registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ReadFileTool));
        registry.register(Box::new(WriteFileTool));
        registry.register(Box::new(ExecuteCommandTool));
        for action in BrowserAction::ALL {
            registry.register(Box::new(BrowserTool::new(action)));
        }
        registry
    }

    /// Register a tool, replacing any tool of the same name.
    pub fn register(&mut self, tool: Box<dyn BuiltinTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn BuiltinTool> {
        self.tools.get(name).map(AsRef::as_ref)
    }

    /// Registered tool names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Definitions of all registered tools, sorted by name.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.names()
            .into_iter()
            .filter_map(|n| self.get(n))
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

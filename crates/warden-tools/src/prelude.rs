//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_tools::prelude::*;` to import all essential types.

pub use crate::{
    AutomationBackend, BuiltinTool, CommandOutput, ExecutorConfig, OperationExecutor, ToolContext,
    ToolError, ToolRegistry,
};

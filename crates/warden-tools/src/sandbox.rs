//! Built-in tools backed by the [`OperationExecutor`](crate::OperationExecutor).
//!
//! The executor's file operations block; the tools run them on tokio's
//! blocking pool.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use warden_core::{OpError, OpResult, params};

use crate::executor::{EXECUTE_COMMAND_TOOL, OperationExecutor, READ_FILE_TOOL, WRITE_FILE_TOOL};
use crate::{BuiltinTool, ToolContext, ToolError};

fn to_value<T: Serialize>(result: OpResult<T>) -> OpResult<Value> {
    let OpResult {
        success,
        data,
        error,
    } = result;
    match data.map(serde_json::to_value).transpose() {
        Ok(data) => OpResult {
            success,
            data,
            error,
        },
        Err(e) => OpResult::err(OpError::internal(format!("failed to encode result: {e}"))),
    }
}

async fn on_blocking_pool<T, F>(ctx: &ToolContext, op: F) -> OpResult<Value>
where
    T: Serialize + Send + 'static,
    F: FnOnce(&OperationExecutor) -> OpResult<T> + Send + 'static,
{
    let executor = Arc::clone(&ctx.executor);
    match tokio::task::spawn_blocking(move || op(&executor)).await {
        Ok(result) => to_value(result),
        Err(e) => OpResult::err(OpError::internal(format!("file task failed: {e}"))),
    }
}

fn required<'a>(value: Option<&'a str>, key: &str) -> Result<&'a str, OpError> {
    value.ok_or_else(|| ToolError::InvalidArguments(format!("{key} is required")).into())
}

/// `sandbox_read_file`
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadFileTool;

#[async_trait::async_trait]
impl BuiltinTool for ReadFileTool {
    fn name(&self) -> &'static str {
        READ_FILE_TOOL
    }

    fn description(&self) -> &'static str {
        "Reads a file inside the allowed paths."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to read" }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> OpResult<Value> {
        match required(params::path_param(&args), "path") {
            Ok(path) => {
                let path = path.to_string();
                on_blocking_pool(ctx, move |executor| executor.read_file(&path)).await
            },
            Err(e) => OpResult::err(e),
        }
    }
}

/// `sandbox_write_file`
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteFileTool;

#[async_trait::async_trait]
impl BuiltinTool for WriteFileTool {
    fn name(&self) -> &'static str {
        WRITE_FILE_TOOL
    }

    fn description(&self) -> &'static str {
        "Writes a file inside the allowed paths. The previous content is checkpointed first."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to write" },
                "content": { "type": "string", "description": "New file content" }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> OpResult<Value> {
        let path = match required(params::path_param(&args), "path") {
            Ok(p) => p,
            Err(e) => return OpResult::err(e),
        };
        match required(params::content_param(&args), "content") {
            Ok(content) => {
                let (path, content) = (path.to_string(), content.to_string());
                on_blocking_pool(ctx, move |executor| executor.write_file(&path, &content)).await
            },
            Err(e) => OpResult::err(e),
        }
    }
}

/// `sandbox_execute_command`
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteCommandTool;

#[async_trait::async_trait]
impl BuiltinTool for ExecuteCommandTool {
    fn name(&self) -> &'static str {
        EXECUTE_COMMAND_TOOL
    }

    fn description(&self) -> &'static str {
        "Runs a single command without a shell. Shell metacharacters are rejected."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": { "type": "string", "description": "Binary and arguments" }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> OpResult<Value> {
        match required(params::command_param(&args), "command") {
            Ok(command) => to_value(ctx.executor.execute_command(command).await),
            Err(e) => OpResult::err(e),
        }
    }
}

//! Call command - mediate a single tool call end to end.

use std::sync::Arc;

use colored::Colorize;
use serde_json::Value;
use warden_audit::ExportFormat;
use warden_core::{OpResult, ToolCallRequest};
use warden_runtime::{DispatchOutcome, Dispatcher};

use crate::approval_prompt::{PromptMode, spawn_prompter};
use crate::theme::Theme;

/// Dispatch one call, answering approval requests per `mode`, then print
/// the decision, the result and the operation log. Returns whether the call
/// ran and succeeded.
pub(crate) async fn run_call(
    dispatcher: &Dispatcher,
    tool: &str,
    params: Value,
    mode: PromptMode,
    log_format: ExportFormat,
) -> anyhow::Result<bool> {
    let prompter = spawn_prompter(Arc::clone(dispatcher.approval()), mode);
    let outcome = dispatcher.dispatch(ToolCallRequest::new(tool, params)).await;
    prompter.abort();

    print_outcome(tool, &outcome)?;

    println!("\n{}", Theme::header("Operation Log"));
    println!("{}", Theme::separator());
    println!("{}", dispatcher.logger().export(log_format)?);

    Ok(outcome.succeeded())
}

fn print_outcome(tool: &str, outcome: &DispatchOutcome) -> anyhow::Result<()> {
    let decision = &outcome.decision;
    if !decision.approved {
        println!("{}", Theme::error(&format!("{tool} denied: {}", decision.reason)));
        return Ok(());
    }
    println!("{}", Theme::success(&format!("{tool} approved: {}", decision.reason)));

    let Some(result) = &outcome.result else {
        return Ok(());
    };
    print_result(result)?;
    println!(
        "{}",
        Theme::dimmed(&format!("took {}ms", outcome.duration.as_millis()))
    );
    Ok(())
}

fn print_result(result: &OpResult<Value>) -> anyhow::Result<()> {
    if let Some(data) = &result.data {
        println!("{}", serde_json::to_string_pretty(data)?);
    }
    if let Some(error) = &result.error {
        println!(
            "{} {}",
            format!("[{}]", error.kind).red().bold(),
            error.message
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use warden_core::{PolicyStore, ToolPermissionConfig};
    use warden_runtime::DispatcherConfig;

    fn dispatcher(dir: &TempDir) -> Dispatcher {
        let root = dir.path().canonicalize().unwrap();
        let policy = PolicyStore::new([ToolPermissionConfig::new("sandbox_write_file")
            .with_requires_approval(true)
            .with_allowed_path(format!("{}/**", root.display()))]);
        Dispatcher::new(policy, DispatcherConfig::new(root))
    }

    #[tokio::test]
    async fn test_assume_yes_answers_the_prompt() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir);

        let ok = run_call(
            &d,
            "sandbox_write_file",
            json!({"path": "out.txt", "content": "hello"}),
            PromptMode::AssumeYes,
            ExportFormat::Text,
        )
        .await
        .unwrap();

        assert!(ok);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out.txt")).unwrap(),
            "hello"
        );
        assert_eq!(d.approval().remembered_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir);

        let ok = run_call(&d, "nope", json!({}), PromptMode::AssumeYes, ExportFormat::Json)
            .await
            .unwrap();
        assert!(!ok);
        assert!(!d.logger().is_empty());
    }
}

//! Answers approval requests from the terminal.
//!
//! The prompter subscribes to the engine's notifications before the call is
//! dispatched, so no request can be missed, and answers each `Requested`
//! event through [`ApprovalEngine::handle_user_response`].

use std::sync::Arc;

use dialoguer::Select;
use dialoguer::theme::ColorfulTheme;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use warden_approval::{ApprovalEngine, ApprovalNotification, UserChoice};
use warden_core::RiskLevel;

use crate::theme::Theme;

const CHOICES: [&str; 3] = ["Allow once", "Always allow this exact call", "Deny"];

/// Longest parameter preview shown in the approval box.
const PARAMS_PREVIEW_CHARS: usize = 48;

/// How approval requests are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromptMode {
    /// Ask on the terminal.
    Interactive,
    /// Approve every request once without asking.
    AssumeYes,
}

/// Map a menu selection to an approval response. Anything but an explicit
/// allow, including a cancelled prompt, denies.
pub(crate) fn response_for(selection: Option<usize>) -> (bool, Option<UserChoice>) {
    match selection {
        Some(0) => (true, Some(UserChoice::Once)),
        Some(1) => (true, Some(UserChoice::Always)),
        _ => (false, None),
    }
}

/// Start answering approval requests from `engine` until the task is aborted
/// or the engine is dropped.
pub(crate) fn spawn_prompter(engine: Arc<ApprovalEngine>, mode: PromptMode) -> JoinHandle<()> {
    let mut notifications = engine.subscribe();
    tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(ApprovalNotification::Requested {
                    request_id,
                    tool,
                    params,
                    risk_level,
                    reason,
                    ..
                }) => {
                    let (approved, choice) = match mode {
                        PromptMode::AssumeYes => {
                            eprintln!("{}", Theme::info(&format!("approving {tool} (--yes)")));
                            (true, Some(UserChoice::Once))
                        },
                        PromptMode::Interactive => {
                            let preview = params_preview(&params);
                            eprintln!("{}", render_request(&tool, &preview, risk_level, &reason));
                            let selection = tokio::task::spawn_blocking(prompt)
                                .await
                                .unwrap_or_else(|e| {
                                    warn!(error = %e, "approval prompt task failed");
                                    None
                                });
                            response_for(selection)
                        },
                    };
                    if !engine.handle_user_response(&request_id, approved, choice) {
                        eprintln!(
                            "{}",
                            Theme::warning(&format!("{request_id} was already resolved"))
                        );
                    }
                },
                Ok(ApprovalNotification::Resolved {
                    request_id, reason, ..
                }) => {
                    debug!(%request_id, %reason, "approval resolved");
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "approval notifications lagged");
                },
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn prompt() -> Option<usize> {
    Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Approve this call?")
        .items(&CHOICES)
        .default(0)
        .interact_opt()
        .unwrap_or_else(|e| {
            warn!(error = %e, "approval prompt failed, denying");
            None
        })
}

fn params_preview(params: &serde_json::Value) -> String {
    let compact = params.to_string();
    if compact.chars().count() <= PARAMS_PREVIEW_CHARS {
        return compact;
    }
    let mut short: String = compact.chars().take(PARAMS_PREVIEW_CHARS).collect();
    short.push('…');
    short
}

fn render_request(tool: &str, params: &str, risk: RiskLevel, reason: &str) -> String {
    let content = [
        Theme::kv("tool", tool),
        Theme::kv("risk", &Theme::risk_level(risk)),
        Theme::kv("params", params),
        Theme::kv("why", reason),
    ]
    .join("\n");
    Theme::approval_box("Approval required", &content, risk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_for_selection() {
        assert_eq!(response_for(Some(0)), (true, Some(UserChoice::Once)));
        assert_eq!(response_for(Some(1)), (true, Some(UserChoice::Always)));
        assert_eq!(response_for(Some(2)), (false, None));
        assert_eq!(response_for(None), (false, None));
    }

    #[test]
    fn test_params_preview_truncates() {
        assert_eq!(params_preview(&json!({"a": 1})), r#"{"a":1}"#);
        let long = params_preview(&json!({"content": "x".repeat(200)}));
        assert_eq!(long.chars().count(), 49);
        assert!(long.ends_with('…'));
    }
}

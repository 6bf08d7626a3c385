//! Policy command - inspect the effective policy and dry-run decisions.

use colored::Colorize;
use warden_approval::ApprovalPreferences;
use warden_core::{PolicyStore, ToolCallRequest, ToolPermissionConfig};
use warden_runtime::Dispatcher;

use crate::theme::Theme;

/// Print every tool's permission config.
pub(crate) fn show_policy(policy: &PolicyStore, json: bool) -> anyhow::Result<()> {
    let configs = policy.configs();

    if json {
        let plain: Vec<&ToolPermissionConfig> = configs.iter().map(|c| c.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&plain)?);
        return Ok(());
    }

    if configs.is_empty() {
        println!("{}", Theme::info("No tools configured"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Tool Policy"));
    println!(
        "{:<26} {:<9} {}",
        "TOOL".dimmed(),
        "APPROVAL".dimmed(),
        "RISK".dimmed()
    );
    println!("{}", Theme::separator());

    for config in &configs {
        println!(
            "{:<26} {:<9} {}",
            config.tool,
            Theme::flag(config.requires_approval),
            Theme::risk_level(config.risk_level)
        );
        print_constraints(config);
    }

    println!();
    Ok(())
}

fn print_constraints(config: &ToolPermissionConfig) {
    let constraints = &config.sandbox_constraints;
    if !constraints.allowed_paths.is_empty() {
        println!(
            "  {}",
            Theme::dimmed(&format!("paths: {}", constraints.allowed_paths.join(", ")))
        );
    }
    if !constraints.allowed_urls.is_empty() {
        println!(
            "  {}",
            Theme::dimmed(&format!("urls: {}", constraints.allowed_urls.join(", ")))
        );
    }
    if let Some(max) = constraints.max_file_size {
        println!("  {}", Theme::dimmed(&format!("max file size: {max} bytes")));
    }
    if !config.auto_approve_patterns.is_empty() {
        println!(
            "  {}",
            Theme::dimmed(&format!(
                "auto-approve: {}",
                config.auto_approve_patterns.join(", ")
            ))
        );
    }
}

/// Evaluate a call against the policy without asking anyone.
///
/// Confirmation is switched off first, so the answer reflects only policy,
/// sandbox constraints and auto-approve rules. Returns whether the call
/// would be approved.
pub(crate) async fn check_policy(
    dispatcher: &Dispatcher,
    tool: &str,
    params: serde_json::Value,
    json: bool,
) -> anyhow::Result<bool> {
    let engine = dispatcher.approval();
    engine.set_preferences(ApprovalPreferences {
        require_confirmation: false,
        ..engine.preferences()
    });

    let decision = engine.evaluate(&ToolCallRequest::new(tool, params)).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else if decision.approved {
        let how = if decision.auto_approved {
            "auto-approved"
        } else {
            "allowed"
        };
        println!("{}", Theme::success(&format!("{tool} {how}: {}", decision.reason)));
    } else {
        println!("{}", Theme::error(&format!("{tool} denied: {}", decision.reason)));
    }
    Ok(decision.approved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use warden_runtime::DispatcherConfig;

    fn dispatcher(dir: &TempDir) -> Dispatcher {
        let root = dir.path().canonicalize().unwrap();
        let policy = PolicyStore::new([ToolPermissionConfig::new("sandbox_write_file")
            .with_allowed_path(format!("{}/**", root.display()))
            .with_allowed_path("!**/.env")]);
        Dispatcher::new(policy, DispatcherConfig::new(root))
    }

    #[tokio::test]
    async fn test_check_never_waits_for_a_human() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir);

        let approved = check_policy(
            &d,
            "sandbox_write_file",
            json!({"path": "out.txt", "content": "hi"}),
            true,
        )
        .await
        .unwrap();
        assert!(approved);
        assert_eq!(d.approval().pending_count(), 0);
        assert!(!dir.path().join("out.txt").exists());
    }

    #[tokio::test]
    async fn test_check_reports_denials() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir);

        let env = json!({"path": ".env", "content": "X=1"});
        assert!(!check_policy(&d, "sandbox_write_file", env, true).await.unwrap());
        assert!(!check_policy(&d, "nope", json!({}), false).await.unwrap());
    }

    #[test]
    fn test_show_policy_json() {
        let policy = PolicyStore::new([ToolPermissionConfig::new("sandbox_read_file")]);
        assert!(show_policy(&policy, true).is_ok());
        assert!(show_policy(&PolicyStore::default(), false).is_ok());
    }
}

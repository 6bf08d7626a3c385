//! Integration tests for sandbox enforcement: denied calls must leave the
//! filesystem untouched, and dangerous commands must never spawn.

mod common;

use common::{Harness, command, write, write_policy};
use serde_json::json;
use warden_audit::LogStatus;
use warden_core::{ErrorKind, PolicyStore, RiskLevel, ToolCallRequest, ToolPermissionConfig};

/// The `/proj` policy with the write tool auto-approved, as in the
/// canonical scenario.
fn proj() -> Harness {
    Harness::new(
        |root| {
            PolicyStore::new([
                write_policy(root).with_auto_approve("**"),
                ToolPermissionConfig::new("sandbox_execute_command")
                    .with_requires_approval(false)
                    .with_risk_level(RiskLevel::High),
            ])
        },
        |_| {},
    )
}

#[tokio::test]
async fn test_env_write_is_denied_before_any_io() {
    let h = proj();
    let env = h.root.join(".env");
    let outcome = h
        .dispatcher
        .dispatch(write(&env.display().to_string(), "X=1"))
        .await;

    assert!(!outcome.decision.approved);
    assert!(outcome.decision.reason.contains("!**/.env"));
    assert!(!env.exists());
    assert!(h.tree().is_empty());
    assert!(h.dispatcher.list_checkpoints().is_empty());
    assert!(h.dispatcher.executor().checkpoints().snapshots().is_empty());
}

#[tokio::test]
async fn test_env_write_is_denied_by_the_executor_too() {
    let h = proj();
    let result = h.dispatcher.executor().write_file(".env", "X=1");
    assert_eq!(result.error_kind(), Some(ErrorKind::PolicyViolation));
    assert!(h.tree().is_empty());
}

#[tokio::test]
async fn test_auto_approved_write_makes_one_snapshot_and_one_checkpoint() {
    let h = proj();
    let out = h.root.join("out.txt");
    let outcome = h
        .dispatcher
        .dispatch(write(&out.display().to_string(), "hello"))
        .await;

    assert!(outcome.decision.auto_approved);
    assert!(outcome.succeeded());
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello");
    assert_eq!(h.dispatcher.list_checkpoints().len(), 1);
    assert_eq!(h.dispatcher.executor().checkpoints().snapshots().len(), 1);
}

#[tokio::test]
async fn test_denied_calls_leave_the_tree_unchanged() {
    let h = proj();
    std::fs::write(h.root.join("keep.txt"), "original").unwrap();
    let before = h.tree();

    let attempts = [
        write("../escape.txt", "x"),
        write("/etc/warden-should-not-exist", "x"),
        write("nested/.env", "SECRET=1"),
        write("a/../../escape.txt", "x"),
        ToolCallRequest::new("sandbox_write_file", json!({"content": "no path"})),
        ToolCallRequest::new("sandbox_delete_file", json!({"path": "keep.txt"})),
    ];
    for request in attempts {
        let outcome = h.dispatcher.dispatch(request).await;
        assert!(
            !outcome.succeeded(),
            "unexpected success: {}",
            outcome.decision.reason
        );
    }

    assert_eq!(h.tree(), before);
    assert_eq!(
        std::fs::read_to_string(h.root.join("keep.txt")).unwrap(),
        "original"
    );
    assert!(h.dispatcher.list_checkpoints().is_empty());
    assert_eq!(h.logged(LogStatus::Success), 0);
}

#[tokio::test]
async fn test_chained_command_is_rejected_before_spawn() {
    let h = proj();
    let result = h
        .dispatcher
        .executor()
        .execute_command("git status; rm -rf /")
        .await;
    assert_eq!(result.error_kind(), Some(ErrorKind::ValidationFailure));
    assert!(result.error.unwrap().message.contains(';'));
}

#[cfg(unix)]
#[tokio::test]
async fn test_dangerous_patterns_never_spawn() {
    let h = proj();
    let marker = h.root.join("spawned");
    let marker = marker.display();

    for cmd in [
        format!("touch {marker}; true"),
        format!("touch {marker} && true"),
        format!("touch {marker} | cat"),
        format!("touch $(echo {marker})"),
        format!("touch `echo {marker}`"),
        format!("touch {marker} > /dev/null"),
    ] {
        let outcome = h.dispatcher.dispatch(command(&cmd)).await;
        assert!(outcome.decision.approved);
        let result = outcome.result.unwrap();
        assert_eq!(
            result.error_kind(),
            Some(ErrorKind::ValidationFailure),
            "{cmd}"
        );
    }

    assert!(!h.root.join("spawned").exists());
    assert_eq!(h.logged(LogStatus::Error), 6);
}

#[cfg(unix)]
#[tokio::test]
async fn test_plain_command_runs_in_the_workspace() {
    let h = proj();
    let outcome = h.dispatcher.dispatch(command("pwd")).await;
    assert!(outcome.succeeded());
    let data = outcome.result.unwrap().data.unwrap();
    assert_eq!(
        data["stdout"].as_str().unwrap().trim(),
        h.root.display().to_string()
    );
}

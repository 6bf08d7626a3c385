use super::*;
use serde_json::json;
use tempfile::TempDir;
use warden_approval::{ApprovalNotification, UserChoice};
use warden_audit::{LogFilter, LogStatus};
use warden_core::{ErrorKind, RiskLevel, ToolPermissionConfig};

struct Harness {
    dispatcher: Arc<Dispatcher>,
    root: PathBuf,
    _dir: TempDir,
}

fn harness(require_confirmation: bool) -> Harness {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let workspace = format!("{}/**", root.display());
    let policy = PolicyStore::new([
        ToolPermissionConfig::new("sandbox_read_file")
            .with_requires_approval(false)
            .with_risk_level(RiskLevel::Low)
            .with_allowed_path(workspace.clone()),
        ToolPermissionConfig::new("sandbox_write_file")
            .with_allowed_path(workspace)
            .with_allowed_path("!**/.env")
            .with_max_file_size(1024),
        ToolPermissionConfig::new("custom_tool").with_requires_approval(false),
    ]);
    let mut config = DispatcherConfig::new(root.clone());
    config.preferences.require_confirmation = require_confirmation;
    Harness {
        dispatcher: Arc::new(Dispatcher::new(policy, config)),
        root,
        _dir: dir,
    }
}

fn write(path: &str, content: &str) -> ToolCallRequest {
    ToolCallRequest::new("sandbox_write_file", json!({"path": path, "content": content}))
}

fn count(dispatcher: &Dispatcher, status: LogStatus) -> usize {
    dispatcher
        .logger()
        .get_filtered_logs(&LogFilter::new().with_status(status))
        .len()
}

#[tokio::test]
async fn test_denied_call_is_not_executed() {
    let h = harness(false);
    let outcome = h
        .dispatcher
        .dispatch(ToolCallRequest::new("rm_everything", json!({})))
        .await;
    assert!(!outcome.decision.approved);
    assert!(outcome.result.is_none());
    assert_eq!(outcome.duration, Duration::ZERO);
    assert_eq!(count(&h.dispatcher, LogStatus::Started), 0);
    assert_eq!(count(&h.dispatcher, LogStatus::Denied), 1);
}

#[tokio::test]
async fn test_approved_write_executes_and_logs() {
    let h = harness(false);
    let outcome = h.dispatcher.dispatch(write("out.txt", "hello")).await;

    assert!(outcome.decision.approved);
    assert!(outcome.succeeded());
    assert_eq!(std::fs::read_to_string(h.root.join("out.txt")).unwrap(), "hello");
    assert_eq!(h.dispatcher.list_checkpoints().len(), 1);
    assert_eq!(count(&h.dispatcher, LogStatus::Started), 1);
    assert_eq!(count(&h.dispatcher, LogStatus::Success), 1);
}

#[tokio::test]
async fn test_excluded_path_never_reaches_disk() {
    let h = harness(false);
    let outcome = h.dispatcher.dispatch(write(".env", "X=1")).await;
    assert!(!outcome.decision.approved);
    assert!(!h.root.join(".env").exists());
    assert!(h.dispatcher.list_checkpoints().is_empty());
}

#[tokio::test]
async fn test_execution_failure_is_logged() {
    let h = harness(false);
    let outcome = h
        .dispatcher
        .dispatch(ToolCallRequest::new(
            "sandbox_read_file",
            json!({"path": "missing.txt"}),
        ))
        .await;
    assert!(outcome.decision.approved);
    assert!(!outcome.succeeded());
    let result = outcome.result.unwrap();
    assert_eq!(result.error_kind(), Some(ErrorKind::ResourceNotFound));
    assert_eq!(count(&h.dispatcher, LogStatus::Error), 1);
}

#[tokio::test]
async fn test_tool_without_handler() {
    let h = harness(false);
    let outcome = h
        .dispatcher
        .dispatch(ToolCallRequest::new("custom_tool", json!({})))
        .await;
    let result = outcome.result.unwrap();
    assert_eq!(result.error_kind(), Some(ErrorKind::ExecutionFailure));
    assert!(result.error.unwrap().message.contains("no handler"));
}

#[tokio::test]
async fn test_human_approval_round_trip() {
    let h = harness(true);
    let mut notes = h.dispatcher.approval().subscribe();

    let dispatcher = Arc::clone(&h.dispatcher);
    let task = tokio::spawn(async move { dispatcher.dispatch(write("doc.md", "# hi")).await });

    let id = match notes.recv().await.unwrap() {
        ApprovalNotification::Requested { request_id, .. } => request_id,
        other => panic!("unexpected notification: {other:?}"),
    };
    assert!(!h.root.join("doc.md").exists());
    assert!(
        h.dispatcher
            .approval()
            .handle_user_response(&id, true, Some(UserChoice::Once))
    );

    let outcome = task.await.unwrap();
    assert!(outcome.succeeded());
    assert!(h.root.join("doc.md").exists());
}

#[tokio::test]
async fn test_checkpoint_operations() {
    let h = harness(false);
    std::fs::write(h.root.join("a.txt"), "v1").unwrap();

    let checkpoint = h
        .dispatcher
        .create_checkpoint("manual", "before refactor", &["a.txt".to_string()])
        .data
        .unwrap();
    h.dispatcher.dispatch(write("a.txt", "v2")).await;
    assert_eq!(h.dispatcher.list_checkpoints()[1].id, checkpoint.id);

    let preview = h.dispatcher.preview_rollback(&checkpoint.id).data.unwrap();
    assert!(preview.can_rollback);
    assert_eq!(std::fs::read_to_string(h.root.join("a.txt")).unwrap(), "v2");

    assert!(h.dispatcher.rollback_to(&checkpoint.id).is_ok());
    assert_eq!(std::fs::read_to_string(h.root.join("a.txt")).unwrap(), "v1");

    assert!(h.dispatcher.delete_checkpoint(&checkpoint.id).is_ok());
    assert_eq!(h.dispatcher.list_checkpoints().len(), 1);
}

#[tokio::test]
async fn test_rollback_snapshot_from_write_outcome() {
    let h = harness(false);
    let outcome = h.dispatcher.dispatch(write("new.txt", "x")).await;
    let data = outcome.result.unwrap().data.unwrap();
    let snapshot_id: SnapshotId = serde_json::from_value(data["snapshot_id"].clone()).unwrap();

    assert!(h.dispatcher.rollback_snapshot(&snapshot_id).is_ok());
    assert!(!h.root.join("new.txt").exists());
}

#[test]
fn test_manual_checkpoint_outside_workspace_denied() {
    let h = harness(false);
    let result = h
        .dispatcher
        .create_checkpoint("", "", &["/etc/passwd".to_string()]);
    assert_eq!(result.error_kind(), Some(ErrorKind::PolicyViolation));
}

#[tokio::test]
async fn test_from_builtin_config() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::builtin().unwrap();
    config.preferences.require_confirmation = false;
    let dispatcher = Dispatcher::from_config(&config, dir.path()).unwrap();

    assert!(dispatcher.policy().contains("sandbox_write_file"));
    assert!(dispatcher.registry().get("browser_navigate").is_some());

    let outcome = dispatcher.dispatch(write(".env", "X=1")).await;
    assert!(!outcome.decision.approved);
    let outcome = dispatcher.dispatch(write("ok.txt", "fine")).await;
    assert!(outcome.succeeded(), "{outcome:?}");
}

#[test]
fn test_from_config_rejects_missing_root() {
    let config = Config::builtin().unwrap();
    let err = Dispatcher::from_config(&config, Path::new("/definitely/not/here")).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidWorkspace { .. }));
}

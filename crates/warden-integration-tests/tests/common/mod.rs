//! Shared test harness for integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use tokio::sync::broadcast;
use warden_approval::{ApprovalNotification, RequestId};
use warden_audit::{LogFilter, LogStatus};
use warden_core::{PolicyStore, ToolCallRequest, ToolPermissionConfig};
use warden_runtime::{Dispatcher, DispatcherConfig};

/// A dispatcher rooted in a fresh temporary workspace.
///
/// The tempdir is cleaned up when the harness is dropped.
#[allow(dead_code)]
pub struct Harness {
    /// The dispatcher under test.
    pub dispatcher: Arc<Dispatcher>,
    /// Canonical workspace root.
    pub root: PathBuf,
    _dir: TempDir,
}

#[allow(dead_code)]
impl Harness {
    /// Build a harness whose policy is produced from the canonical root.
    pub fn new(
        policy: impl FnOnce(&Path) -> PolicyStore,
        configure: impl FnOnce(&mut DispatcherConfig),
    ) -> Self {
        let dir = TempDir::new().expect("failed to create tempdir");
        let root = dir.path().canonicalize().expect("tempdir has no canonical path");
        let mut config = DispatcherConfig::new(root.clone());
        configure(&mut config);
        let dispatcher = Dispatcher::new(policy(&root), config);
        Self {
            dispatcher: Arc::new(dispatcher),
            root,
            _dir: dir,
        }
    }

    /// A harness using the built-in configuration, exactly as `warden` ships.
    pub fn builtin() -> Self {
        let dir = TempDir::new().expect("failed to create tempdir");
        let root = dir.path().canonicalize().expect("tempdir has no canonical path");
        let config = warden_config::Config::builtin().expect("embedded defaults must parse");
        let dispatcher =
            Dispatcher::from_config(&config, &root).expect("tempdir is a valid workspace");
        Self {
            dispatcher: Arc::new(dispatcher),
            root,
            _dir: dir,
        }
    }

    /// Entries in the operation log with `status`.
    pub fn logged(&self, status: LogStatus) -> usize {
        self.dispatcher
            .logger()
            .get_filtered_logs(&LogFilter::new().with_status(status))
            .len()
    }

    /// Sorted names of everything in the workspace, recursively.
    pub fn tree(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect(&self.root, &self.root, &mut names);
        names.sort();
        names
    }
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.display().to_string());
        }
        if path.is_dir() {
            collect(root, &path, out);
        }
    }
}

/// The write policy from the `/proj` scenario, rooted at `root`.
#[allow(dead_code)]
pub fn write_policy(root: &Path) -> ToolPermissionConfig {
    ToolPermissionConfig::new("sandbox_write_file")
        .with_requires_approval(true)
        .with_allowed_path(format!("{}/**", root.display()))
        .with_allowed_path("!**/.env")
}

/// A `sandbox_write_file` call.
#[allow(dead_code)]
pub fn write(path: &str, content: &str) -> ToolCallRequest {
    ToolCallRequest::new(
        "sandbox_write_file",
        json!({"path": path, "content": content}),
    )
}

/// A `sandbox_execute_command` call.
#[allow(dead_code)]
pub fn command(cmd: &str) -> ToolCallRequest {
    ToolCallRequest::new("sandbox_execute_command", json!({"command": cmd}))
}

/// Wait for the next approval request and return its id.
#[allow(dead_code)]
pub async fn next_request_id(rx: &mut broadcast::Receiver<ApprovalNotification>) -> RequestId {
    loop {
        if let ApprovalNotification::Requested { request_id, .. } =
            rx.recv().await.expect("notification channel closed")
        {
            return request_id;
        }
    }
}

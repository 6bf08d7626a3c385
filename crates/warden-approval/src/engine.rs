//! The approval engine.
//!
//! [`ApprovalEngine::evaluate`] applies these checks in order and stops at
//! the first one that decides:
//!
//! 1. Tool absent from the policy store: deny.
//! 2. A sandbox constraint fails: deny, naming the constraint.
//! 3. A remembered "always" answer exists for this exact call: approve.
//! 4. An auto-approve pattern matches the call: approve.
//! 5. Low risk and `auto_approve_low_risk` is on: approve.
//! 6. The tool requires approval and `require_confirmation` is on: park the
//!    request in the pending table and wait for a human or the timeout.
//! 7. Otherwise: approve.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};
use warden_audit::OperationLogger;
use warden_core::params::command_param;
use warden_core::{
    PolicyStore, RiskLevel, Timestamp, ToolCallRequest, ToolPermissionConfig, canonical_json,
};
use warden_workspace::{CheckedRequest, PatternSet, check_request};

use crate::error::{ApprovalError, ApprovalResult};
use crate::pending::{PendingApproval, PendingCleanup, PendingTable, UserResponse};
use crate::remembered::RememberedChoices;
use crate::request::{ApprovalDecision, ApprovalNotification, PendingRequest, RequestId, UserChoice};

/// How long a request waits for a human before it is denied.
pub const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_secs(60);

const NOTIFICATION_CAPACITY: usize = 64;

/// Global approval preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalPreferences {
    /// Approve low-risk tools without asking.
    pub auto_approve_low_risk: bool,
    /// Ask a human for tools that require approval.
    pub require_confirmation: bool,
    /// How long to wait for the human.
    pub timeout: Duration,
}

impl Default for ApprovalPreferences {
    fn default() -> Self {
        Self {
            auto_approve_low_risk: false,
            require_confirmation: true,
            timeout: DEFAULT_APPROVAL_TIMEOUT,
        }
    }
}

enum Precheck {
    Decided(ApprovalDecision),
    NeedsHuman,
}

/// Evaluates tool calls against policy and mediates human approval.
pub struct ApprovalEngine {
    policy: PolicyStore,
    logger: OperationLogger,
    workspace_root: PathBuf,
    preferences: RwLock<ApprovalPreferences>,
    remembered: RememberedChoices,
    pending: PendingTable,
    notifications: broadcast::Sender<ApprovalNotification>,
}

impl ApprovalEngine {
    /// Create an engine. Relative request paths resolve against
    /// `workspace_root`.
    #[must_use]
    pub fn new(
        policy: PolicyStore,
        logger: OperationLogger,
        preferences: ApprovalPreferences,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            policy,
            logger,
            workspace_root: workspace_root.into(),
            preferences: RwLock::new(preferences),
            remembered: RememberedChoices::new(),
            pending: PendingTable::default(),
            notifications,
        }
    }

    /// The policy store.
    #[must_use]
    pub fn policy(&self) -> &PolicyStore {
        &self.policy
    }

    /// The workspace root relative paths resolve against.
    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Current preferences.
    #[must_use]
    pub fn preferences(&self) -> ApprovalPreferences {
        *self
            .preferences
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the preferences. Requests already waiting keep their deadline.
    pub fn set_preferences(&self, preferences: ApprovalPreferences) {
        *self
            .preferences
            .write()
            .unwrap_or_else(PoisonError::into_inner) = preferences;
    }

    /// Subscribe to approval requests and resolutions.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ApprovalNotification> {
        self.notifications.subscribe()
    }

    /// Decide whether a tool call may proceed. Never fails: every error
    /// becomes a denial with a reason, and every outcome is logged.
    pub async fn evaluate(&self, request: &ToolCallRequest) -> ApprovalDecision {
        debug!(tool = %request.tool, source = ?request.source, "evaluating tool call");

        let outcome = match self.precheck(request) {
            Ok(Precheck::Decided(decision)) => Ok(decision),
            Ok(Precheck::NeedsHuman) => self.wait_for_user(request).await,
            Err(e) => Err(e),
        };
        let decision = outcome.unwrap_or_else(|e| ApprovalDecision::denied(e.to_string()));

        if decision.approved {
            info!(tool = %request.tool, reason = %decision.reason, "tool call approved");
            self.logger
                .log_approval_granted(&request.tool, &decision.reason, decision.auto_approved);
        } else {
            warn!(tool = %request.tool, reason = %decision.reason, "tool call denied");
            self.logger.log_approval_denied(&request.tool, &decision.reason);
        }
        decision
    }

    /// Steps 1 to 5 and 7; the only step that waits is left to the caller.
    fn precheck(&self, request: &ToolCallRequest) -> ApprovalResult<Precheck> {
        let config = self
            .policy
            .get(&request.tool)
            .ok_or_else(|| ApprovalError::UnknownTool {
                tool: request.tool.clone(),
            })?;

        let checked = check_request(
            &config.sandbox_constraints,
            &request.params,
            &self.workspace_root,
        )?;

        if self
            .remembered
            .lookup(&request.tool, &request.params)
            .is_some()
        {
            return Ok(Precheck::Decided(ApprovalDecision::auto(
                "remembered choice: always allow",
            )));
        }

        if let Some(pattern) = matching_auto_approve(&config, request, &checked) {
            return Ok(Precheck::Decided(ApprovalDecision::auto(format!(
                "matched auto-approve pattern '{pattern}'"
            ))));
        }

        let prefs = self.preferences();
        if config.risk_level == RiskLevel::Low && prefs.auto_approve_low_risk {
            return Ok(Precheck::Decided(ApprovalDecision::auto(
                "low-risk tool auto-approved",
            )));
        }

        if config.requires_approval && prefs.require_confirmation {
            return Ok(Precheck::NeedsHuman);
        }

        Ok(Precheck::Decided(ApprovalDecision::allowed(
            "approval not required",
        )))
    }

    async fn wait_for_user(&self, request: &ToolCallRequest) -> ApprovalResult<ApprovalDecision> {
        let timeout = self.preferences().timeout;
        let risk_level = self
            .policy
            .get(&request.tool)
            .map(|c| c.risk_level)
            .unwrap_or_default();

        let request_id = RequestId::new();
        let created_at = Timestamp::now();
        let deadline = deadline_after(created_at, timeout);
        let reason = format!("{} requires approval ({risk_level} risk)", request.tool);
        let (responder, mut rx) = oneshot::channel();

        self.pending.insert(
            request_id,
            PendingApproval {
                request: request.clone(),
                risk_level,
                created_at,
                deadline,
                responder,
            },
        );
        let _cleanup = PendingCleanup {
            table: &self.pending,
            id: request_id,
        };

        self.logger.log_awaiting_approval(
            &request.tool,
            &request_id.to_string(),
            risk_level,
            &reason,
        );
        info!(%request_id, tool = %request.tool, "awaiting approval");
        // No subscribers is fine; the request still times out.
        let _ = self.notifications.send(ApprovalNotification::Requested {
            request_id,
            tool: request.tool.clone(),
            params: request.params.clone(),
            risk_level,
            reason,
            deadline,
        });

        let response = match tokio::time::timeout(timeout, &mut rx).await {
            Ok(answer) => answer.ok(),
            Err(_) => {
                if self.pending.remove(&request_id).is_some() {
                    warn!(%request_id, tool = %request.tool, "approval timed out");
                    self.notify_resolved(request_id, false, "timeout");
                    return Err(ApprovalError::Timeout);
                }
                // A response removed the entry first; its answer is in flight.
                rx.await.ok()
            },
        };

        match response {
            Some(UserResponse { approved: true, choice }) => {
                Ok(ApprovalDecision::by_user(choice.unwrap_or(UserChoice::Once)))
            },
            Some(UserResponse { approved: false, .. }) => Err(ApprovalError::DeniedByUser),
            None => Err(ApprovalError::Abandoned),
        }
    }

    /// Answer a pending request.
    ///
    /// Returns `false`, with a warning, if the request is unknown or already
    /// resolved; a second answer has no effect. Only an approval with
    /// [`UserChoice::Always`] is remembered, for the exact `(tool, params)`
    /// call. Denials are never remembered.
    pub fn handle_user_response(
        &self,
        request_id: &RequestId,
        approved: bool,
        remember: Option<UserChoice>,
    ) -> bool {
        let Some(pending) = self.pending.remove(request_id) else {
            warn!(%request_id, "no pending approval; already resolved or timed out");
            return false;
        };

        if approved {
            if let Some(choice) = remember.filter(|c| c.is_remembered()) {
                self.remembered
                    .remember(&pending.request.tool, &pending.request.params, choice);
            }
        }

        let response = UserResponse {
            approved,
            choice: remember,
        };
        if pending.responder.send(response).is_err() {
            debug!(%request_id, "approval waiter went away before the response arrived");
        }

        let reason = if approved {
            "approved by user"
        } else {
            "denied by user"
        };
        self.notify_resolved(*request_id, approved, reason);
        true
    }

    /// Requests currently waiting for a human, oldest first.
    #[must_use]
    pub fn pending_requests(&self) -> Vec<PendingRequest> {
        self.pending.summaries()
    }

    /// Number of requests waiting for a human.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether a request is still waiting.
    #[must_use]
    pub fn is_pending(&self, request_id: &RequestId) -> bool {
        self.pending.contains(request_id)
    }

    /// Forget every remembered approval.
    pub fn clear_remembered_choices(&self) {
        self.remembered.clear();
        info!("cleared remembered approvals");
    }

    /// Forget the remembered approval for one call.
    pub fn forget(&self, tool: &str, params: &serde_json::Value) -> bool {
        self.remembered.forget(tool, params)
    }

    /// Number of remembered approvals.
    #[must_use]
    pub fn remembered_count(&self) -> usize {
        self.remembered.len()
    }

    fn notify_resolved(&self, request_id: RequestId, approved: bool, reason: &str) {
        let _ = self.notifications.send(ApprovalNotification::Resolved {
            request_id,
            approved,
            reason: reason.to_string(),
        });
    }
}

impl std::fmt::Debug for ApprovalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalEngine")
            .field("tools", &self.policy.len())
            .field("workspace_root", &self.workspace_root)
            .field("pending", &self.pending.len())
            .field("remembered", &self.remembered.len())
            .finish_non_exhaustive()
    }
}

/// The string auto-approve patterns are matched against: the canonical
/// path, else the normalized URL, else the command line, else the params
/// as canonical JSON.
fn approval_subject(request: &ToolCallRequest, checked: &CheckedRequest) -> String {
    if let Some(path) = &checked.path {
        return path.display().to_string();
    }
    if let Some(url) = &checked.url {
        return url.clone();
    }
    if let Some(command) = command_param(&request.params) {
        return command.trim().to_string();
    }
    canonical_json(&request.params)
}

fn matching_auto_approve(
    config: &ToolPermissionConfig,
    request: &ToolCallRequest,
    checked: &CheckedRequest,
) -> Option<String> {
    if config.auto_approve_patterns.is_empty() {
        return None;
    }
    let patterns = match PatternSet::compile(&config.auto_approve_patterns) {
        Ok(p) => p,
        Err(e) => {
            warn!(tool = %config.tool, error = %e, "ignoring invalid auto-approve patterns");
            return None;
        },
    };
    let subject = approval_subject(request, checked);
    patterns
        .matches(&subject)
        .map(|p| p.as_str().to_string())
}

fn deadline_after(start: Timestamp, timeout: Duration) -> Timestamp {
    let delta = chrono::TimeDelta::from_std(timeout).unwrap_or(chrono::TimeDelta::MAX);
    start
        .0
        .checked_add_signed(delta)
        .map_or(start, Timestamp::from_datetime)
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

//! Approval decision, request and notification types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use warden_core::{RiskLevel, Timestamp};

/// Unique identifier for a pending approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Create a new random request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req:{}", self.0)
    }
}

/// How long a human approval should be remembered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserChoice {
    /// This call only.
    Once,
    /// This call, on behalf of the current session. Nothing is stored.
    Session,
    /// For every identical call from now on.
    Always,
}

impl UserChoice {
    /// Whether an approval with this choice is stored for reuse.
    #[must_use]
    pub const fn is_remembered(self) -> bool {
        matches!(self, Self::Always)
    }
}

/// The outcome of evaluating a tool call. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    /// Whether the call may proceed.
    pub approved: bool,
    /// Whether it was approved without asking a human.
    pub auto_approved: bool,
    /// Human-readable explanation.
    pub reason: String,
    /// The human's choice, when one was asked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_choice: Option<UserChoice>,
}

impl ApprovalDecision {
    /// Approved by policy without human involvement.
    #[must_use]
    pub fn auto(reason: impl Into<String>) -> Self {
        Self {
            approved: true,
            auto_approved: true,
            reason: reason.into(),
            user_choice: None,
        }
    }

    /// Approved because the tool needs no approval.
    #[must_use]
    pub fn allowed(reason: impl Into<String>) -> Self {
        Self {
            approved: true,
            auto_approved: false,
            reason: reason.into(),
            user_choice: None,
        }
    }

    /// Approved by a human.
    #[must_use]
    pub fn by_user(choice: UserChoice) -> Self {
        Self {
            approved: true,
            auto_approved: false,
            reason: "approved by user".to_string(),
            user_choice: Some(choice),
        }
    }

    /// Denied.
    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            auto_approved: false,
            reason: reason.into(),
            user_choice: None,
        }
    }
}

/// A summary of a request waiting for a human.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRequest {
    /// Identifier to answer with.
    pub request_id: RequestId,
    /// The requested tool.
    pub tool: String,
    /// The call parameters.
    pub params: serde_json::Value,
    /// The tool's risk level.
    pub risk_level: RiskLevel,
    /// When the request was registered.
    pub created_at: Timestamp,
    /// When it will be denied if unanswered.
    pub deadline: Timestamp,
}

/// Events emitted to approval UIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ApprovalNotification {
    /// A request needs a human decision.
    #[serde(rename = "approval-request")]
    Requested {
        /// Identifier to pass to `handle_user_response`.
        request_id: RequestId,
        /// The requested tool.
        tool: String,
        /// The call parameters.
        params: serde_json::Value,
        /// The tool's risk level.
        risk_level: RiskLevel,
        /// Why approval is needed.
        reason: String,
        /// When it will be denied if unanswered.
        deadline: Timestamp,
    },
    /// A pending request was answered or timed out.
    #[serde(rename = "approval-resolved")]
    Resolved {
        /// The request.
        request_id: RequestId,
        /// Whether it was approved.
        approved: bool,
        /// How it was resolved.
        reason: String,
    },
}

impl ApprovalNotification {
    /// The request this notification is about.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::Requested { request_id, .. } | Self::Resolved { request_id, .. } => *request_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_display() {
        let id = RequestId::new();
        assert!(id.to_string().starts_with("req:"));
        assert_ne!(id, RequestId::new());
    }

    #[test]
    fn test_user_choice_remembered() {
        assert!(!UserChoice::Once.is_remembered());
        assert!(!UserChoice::Session.is_remembered());
        assert!(UserChoice::Always.is_remembered());
    }

    #[test]
    fn test_decision_constructors() {
        let d = ApprovalDecision::auto("pattern");
        assert!(d.approved && d.auto_approved);

        let d = ApprovalDecision::by_user(UserChoice::Always);
        assert!(d.approved && !d.auto_approved);
        assert_eq!(d.user_choice, Some(UserChoice::Always));

        let d = ApprovalDecision::denied("timeout");
        assert!(!d.approved);
        let json = serde_json::to_value(&d).unwrap();
        assert!(json.get("user_choice").is_none());
    }

    #[test]
    fn test_notification_tag() {
        let n = ApprovalNotification::Resolved {
            request_id: RequestId::new(),
            approved: false,
            reason: "timeout".into(),
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "approval-resolved");
    }
}

//! Warden Approval - Policy evaluation and human-in-the-loop approval.
//!
//! The [`ApprovalEngine`] decides whether a [`ToolCallRequest`] may proceed.
//! It checks the policy store, the tool's sandbox constraints, remembered
//! answers, auto-approve patterns and preferences, and only then parks the
//! request for a human. A parked request resolves exactly once: either
//! [`ApprovalEngine::handle_user_response`] or the timeout wins, and the
//! other finds nothing to do.
//!
//! UIs learn about parked requests through [`ApprovalEngine::subscribe`].
//!
//! # Example
//!
//! ```rust,no_run
//! use warden_approval::{ApprovalEngine, ApprovalPreferences};
//! use warden_audit::OperationLogger;
//! use warden_core::{PolicyStore, ToolCallRequest, ToolPermissionConfig};
//!
//! # async fn demo() {
//! let policy = PolicyStore::new([ToolPermissionConfig::new("sandbox_execute_command")
//!     .with_auto_approve("git status")]);
//! let engine = ApprovalEngine::new(
//!     policy,
//!     OperationLogger::default(),
//!     ApprovalPreferences::default(),
//!     "/proj",
//! );
//!
//! let request = ToolCallRequest::new(
//!     "sandbox_execute_command",
//!     serde_json::json!({"command": "git status"}),
//! );
//! assert!(engine.evaluate(&request).await.auto_approved);
//! # }
//! ```
//!
//! [`ToolCallRequest`]: warden_core::ToolCallRequest

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod engine;
/// Error types and results for the approval module.
pub mod error;
mod pending;
pub mod remembered;
pub mod request;

pub use engine::{ApprovalEngine, ApprovalPreferences, DEFAULT_APPROVAL_TIMEOUT};
pub use error::{ApprovalError, ApprovalResult};
pub use remembered::{RememberKey, RememberedChoices};
pub use request::{ApprovalDecision, ApprovalNotification, PendingRequest, RequestId, UserChoice};

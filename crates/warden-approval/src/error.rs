//! Reasons an approval is refused.

use warden_workspace::Violation;

/// Why a tool call was denied.
///
/// The `Display` form becomes [`ApprovalDecision::reason`](crate::ApprovalDecision).
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// The tool has no entry in the policy store.
    #[error("unknown tool: {tool}")]
    UnknownTool {
        /// The requested tool.
        tool: String,
    },

    /// A sandbox constraint rejected the request.
    #[error("sandbox constraint violated: {0}")]
    Sandbox(#[from] Violation),

    /// Nobody answered before the deadline.
    #[error("timeout")]
    Timeout,

    /// The human said no.
    #[error("denied by user")]
    DeniedByUser,

    /// The pending entry disappeared without an answer.
    #[error("approval request abandoned")]
    Abandoned,
}

/// Result type for approval checks.
pub type ApprovalResult<T> = Result<T, ApprovalError>;

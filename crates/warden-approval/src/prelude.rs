//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_approval::prelude::*;` to import all essential types.

// Engine
pub use crate::{ApprovalEngine, ApprovalPreferences};

// Decisions and notifications
pub use crate::{ApprovalDecision, ApprovalNotification, PendingRequest, RequestId, UserChoice};

// Errors
pub use crate::{ApprovalError, ApprovalResult};

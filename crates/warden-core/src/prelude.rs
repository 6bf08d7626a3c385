//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_core::prelude::*;` to import all essential types.

// Operation envelope
pub use crate::{ErrorKind, OpError, OpResult};

// Policy
pub use crate::{PolicyStore, SandboxConstraints, ToolPermissionConfig};

// Common types
pub use crate::{ContentHash, RequestSource, RiskLevel, Timestamp, ToolCallRequest};

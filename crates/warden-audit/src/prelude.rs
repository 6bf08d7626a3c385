//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_audit::prelude::*;` to import all essential types.

// Errors
pub use crate::{AuditError, AuditResult};

// Entries
pub use crate::{LogCategory, LogEntry, LogEntryId, LogLevel, LogStatus};

// Logger
pub use crate::{ExportFormat, LogFilter, LogNotification, LogStats, OperationLogger};

// Subscription
pub use crate::{LogCallback, Subscription};

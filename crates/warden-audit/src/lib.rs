//! Warden Audit - The operation log.
//!
//! This crate provides:
//! - [`LogEntry`] records with level, status and category
//! - [`OperationLogger`], a fixed-capacity ring buffer (oldest evicted first)
//! - Structured helpers for every tool-call lifecycle transition
//! - Conjunctive filtering and JSON / text export
//! - Fan-out to callback subscribers and to topic-filtered async receivers
//!
//! The log lives for the lifetime of the process; nothing is persisted.
//!
//! # Example
//!
//! ```
//! use warden_audit::{LogFilter, LogStatus, OperationLogger};
//!
//! let logger = OperationLogger::new(100);
//! logger.log_tool_start("sandbox_read_file", &serde_json::json!({"path": "a.txt"}));
//! logger.log_approval_denied("sandbox_read_file", "unknown tool");
//!
//! let denied = logger.get_filtered_logs(&LogFilter::new().with_status(LogStatus::Denied));
//! assert_eq!(denied.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod entry;
/// Error types and results for the audit module.
pub mod error;
pub mod filter;
pub mod logger;
pub mod subscriber;

pub use entry::{LogCategory, LogEntry, LogEntryId, LogLevel, LogStatus};
pub use error::{AuditError, AuditResult};
pub use filter::{ExportFormat, LogFilter};
pub use logger::{
    DEFAULT_CAPACITY, LogNotification, LogStats, NotificationReceiver, OperationLogger,
};
pub use subscriber::{LogCallback, SubscriberId, SubscriberRegistry, Subscription};

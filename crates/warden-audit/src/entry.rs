//! Log entry types.
//!
//! Every decision and execution outcome is recorded as a [`LogEntry`] with a
//! human-readable title and message, so any refusal can be explained later.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use warden_core::Timestamp;

/// Unique identifier for a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogEntryId(pub Uuid);

impl LogEntryId {
    /// Create a new random entry ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LogEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LogEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log:{}", self.0)
    }
}

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose detail.
    Debug,
    /// Normal operation.
    Info,
    /// Refusals and recoverable problems.
    Warn,
    /// Failures.
    Error,
}

impl LogLevel {
    /// Lowercase name, used in notification topics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    /// A tool call was received.
    Started,
    /// Waiting on a human decision.
    AwaitingApproval,
    /// The call was approved.
    Approved,
    /// The call was refused.
    Denied,
    /// Execution succeeded.
    Success,
    /// Execution failed.
    Error,
    /// Informational, not tied to a tool call.
    Info,
}

impl LogStatus {
    /// Snake-case name, used in notification topics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subsystem a log entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    /// Tool execution.
    Tool,
    /// Approval decisions.
    Approval,
    /// Runtime housekeeping.
    System,
    /// Sandbox refusals.
    Security,
    /// Checkpoints and rollback.
    Checkpoint,
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tool => "tool",
            Self::Approval => "approval",
            Self::System => "system",
            Self::Security => "security",
            Self::Checkpoint => "checkpoint",
        })
    }
}

/// A single operation log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique entry identifier.
    pub id: LogEntryId,
    /// When this entry was created.
    pub timestamp: Timestamp,
    /// Severity.
    pub level: LogLevel,
    /// Lifecycle status.
    pub status: LogStatus,
    /// Subsystem.
    pub category: LogCategory,
    /// Tool the entry concerns, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Short headline.
    pub title: String,
    /// Human-readable explanation.
    pub message: String,
    /// Structured context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// How long the operation took, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl LogEntry {
    /// Create an entry stamped with the current time.
    #[must_use]
    pub fn new(
        level: LogLevel,
        status: LogStatus,
        category: LogCategory,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: LogEntryId::new(),
            timestamp: Timestamp::now(),
            level,
            status,
            category,
            tool: None,
            title: title.into(),
            message: message.into(),
            details: None,
            duration_ms: None,
        }
    }

    /// Attach the tool name.
    #[must_use]
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attach a duration.
    #[must_use]
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    /// Render as a single line of text.
    #[must_use]
    pub fn to_line(&self) -> String {
        let tool = self
            .tool
            .as_deref()
            .map(|t| format!(" {t}"))
            .unwrap_or_default();
        let duration = self
            .duration_ms
            .map(|ms| format!(" ({ms}ms)"))
            .unwrap_or_default();
        let line = format!(
            "{} [{}] [{}] {}{tool}: {} - {}{duration}",
            self.timestamp,
            self.level.as_str().to_uppercase(),
            self.category,
            self.status,
            self.title,
            self.message,
        );
        line.replace('\r', "\\r").replace('\n', "\\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serializes_optional_fields_only_when_set() {
        let entry = LogEntry::new(
            LogLevel::Info,
            LogStatus::Started,
            LogCategory::Tool,
            "Tool started",
            "sandbox_read_file",
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "info");
        assert_eq!(json["status"], "started");
        assert_eq!(json["category"], "tool");
        assert!(json.get("tool").is_none());
        assert!(json.get("duration_ms").is_none());

        let json = serde_json::to_value(entry.with_tool("t").with_duration_ms(5)).unwrap();
        assert_eq!(json["tool"], "t");
        assert_eq!(json["duration_ms"], 5);
    }

    #[test]
    fn test_to_line_is_single_line() {
        let entry = LogEntry::new(
            LogLevel::Error,
            LogStatus::Error,
            LogCategory::Tool,
            "Tool failed",
            "first\nsecond",
        )
        .with_tool("sandbox_execute_command")
        .with_duration_ms(12);
        let line = entry.to_line();
        assert!(!line.contains('\n'));
        assert!(line.contains("[ERROR] [tool] error sandbox_execute_command: Tool failed"));
        assert!(line.ends_with("first\\nsecond (12ms)"));
    }

    #[test]
    fn test_status_names() {
        assert_eq!(LogStatus::AwaitingApproval.as_str(), "awaiting_approval");
        let s: LogStatus = serde_json::from_str("\"awaiting_approval\"").unwrap();
        assert_eq!(s, LogStatus::AwaitingApproval);
    }
}

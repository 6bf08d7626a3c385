//! Log queries and export formats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::entry::{LogCategory, LogEntry, LogLevel, LogStatus};
use crate::error::AuditError;

/// A conjunctive filter over log entries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogFilter {
    /// Exact level.
    pub level: Option<LogLevel>,
    /// Exact status.
    pub status: Option<LogStatus>,
    /// Exact category.
    pub category: Option<LogCategory>,
    /// Exact tool name.
    pub tool: Option<String>,
    /// Case-insensitive substring of title, message or tool.
    pub search: Option<String>,
    /// Inclusive lower time bound.
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper time bound.
    pub until: Option<DateTime<Utc>>,
}

impl LogFilter {
    /// A filter that matches everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a level.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Require a status.
    #[must_use]
    pub fn with_status(mut self, status: LogStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Require a category.
    #[must_use]
    pub fn with_category(mut self, category: LogCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Require a tool.
    #[must_use]
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Require a substring.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Require a time range.
    #[must_use]
    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    /// Whether `entry` satisfies every set field.
    #[must_use]
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if self.level.is_some_and(|l| l != entry.level)
            || self.status.is_some_and(|s| s != entry.status)
            || self.category.is_some_and(|c| c != entry.category)
        {
            return false;
        }
        if self
            .tool
            .as_deref()
            .is_some_and(|t| entry.tool.as_deref() != Some(t))
        {
            return false;
        }
        let at = entry.timestamp.0;
        if self.since.is_some_and(|s| at < s) || self.until.is_some_and(|u| at > u) {
            return false;
        }
        match &self.search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                entry.title.to_lowercase().contains(&needle)
                    || entry.message.to_lowercase().contains(&needle)
                    || entry
                        .tool
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&needle))
            },
            None => true,
        }
    }
}

/// Export encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// A JSON array of entries.
    #[default]
    Json,
    /// One line per entry.
    Text,
}

impl FromStr for ExportFormat {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "txt" => Ok(Self::Text),
            other => Err(AuditError::UnknownFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry() -> LogEntry {
        LogEntry::new(
            LogLevel::Warn,
            LogStatus::Denied,
            LogCategory::Approval,
            "Approval denied",
            "path '/proj/.env' is excluded",
        )
        .with_tool("sandbox_write_file")
    }

    #[test]
    fn test_empty_filter_matches_all() {
        assert!(LogFilter::new().matches(&entry()));
    }

    #[test]
    fn test_all_fields_conjunctive() {
        let e = entry();
        let f = LogFilter::new()
            .with_level(LogLevel::Warn)
            .with_status(LogStatus::Denied)
            .with_category(LogCategory::Approval)
            .with_tool("sandbox_write_file")
            .with_search(".ENV");
        assert!(f.matches(&e));

        assert!(!f.clone().with_level(LogLevel::Info).matches(&e));
        assert!(!f.clone().with_tool("other").matches(&e));
        assert!(!f.with_search("nothing-like-this").matches(&e));
    }

    #[test]
    fn test_tool_filter_rejects_toolless_entries() {
        let e = LogEntry::new(
            LogLevel::Info,
            LogStatus::Info,
            LogCategory::System,
            "Started",
            "",
        );
        assert!(!LogFilter::new().with_tool("x").matches(&e));
    }

    #[test]
    fn test_time_range() {
        let e = entry();
        let at = e.timestamp.0;
        let hour = Duration::hours(1);
        assert!(LogFilter::new().between(at - hour, at + hour).matches(&e));
        assert!(LogFilter::new().between(at, at).matches(&e));
        assert!(!LogFilter::new().between(at + hour, at + hour + hour).matches(&e));
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("text".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}

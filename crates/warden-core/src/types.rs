//! Common value types shared across warden crates.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How dangerous a tool is considered to be.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Read-only or otherwise harmless operations.
    Low,
    /// Operations with contained side effects.
    #[default]
    Medium,
    /// Operations that can destroy data or reach outside the sandbox.
    High,
}

impl RiskLevel {
    /// Lowercase name, as used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A UTC point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// The current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Wrap an existing `DateTime`.
    #[must_use]
    pub const fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// The wrapped `DateTime`.
    #[must_use]
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Time elapsed since this timestamp. Negative if it lies in the future.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Utc::now().signed_duration_since(self.0)
    }

    /// Whether this timestamp is strictly older than `max_age` relative to `now`.
    #[must_use]
    pub fn is_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.0) > max_age
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

/// Who issued a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestSource {
    /// The autonomous agent.
    #[default]
    Agent,
    /// A human driving the tool directly (e.g. the CLI).
    User,
    /// Internal housekeeping.
    System,
}

impl fmt::Display for RequestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agent => f.write_str("agent"),
            Self::User => f.write_str("user"),
            Self::System => f.write_str("system"),
        }
    }
}

/// A single tool call awaiting mediation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Name of the tool being invoked.
    pub tool: String,
    /// Tool arguments, normally a JSON object.
    #[serde(default)]
    pub params: serde_json::Value,
    /// Origin of the call.
    #[serde(default)]
    pub source: RequestSource,
}

impl ToolCallRequest {
    /// Create a request from the agent.
    #[must_use]
    pub fn new(tool: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            tool: tool.into(),
            params,
            source: RequestSource::Agent,
        }
    }

    /// Override the request source.
    #[must_use]
    pub fn with_source(mut self, source: RequestSource) -> Self {
        self.source = source;
        self
    }

    /// Look up a string parameter by name.
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(serde_json::Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_risk_level_serde_lowercase() {
        let json = serde_json::to_string(&RiskLevel::High).unwrap();
        assert_eq!(json, "\"high\"");
        let level: RiskLevel = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(level, RiskLevel::Low);
        assert!(RiskLevel::Low < RiskLevel::High);
    }

    #[test]
    fn test_timestamp_older_than() {
        let now = Utc::now();
        let old = Timestamp(now - Duration::days(8));
        assert!(old.is_older_than(Duration::days(7), now));
        assert!(!Timestamp(now).is_older_than(Duration::days(7), now));
    }

    #[test]
    fn test_request_deserialize_defaults() {
        let req: ToolCallRequest =
            serde_json::from_value(json!({"tool": "sandbox_read_file"})).unwrap();
        assert_eq!(req.source, RequestSource::Agent);
        assert!(req.params.is_null());
    }

    #[test]
    fn test_param_str() {
        let req = ToolCallRequest::new("t", json!({"path": "/a", "n": 3}));
        assert_eq!(req.param_str("path"), Some("/a"));
        assert_eq!(req.param_str("n"), None);
        assert_eq!(req.param_str("missing"), None);
    }
}

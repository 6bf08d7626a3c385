//! Configuration types.
//!
//! Every section implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header produces a working
//! configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use warden_core::ToolPermissionConfig;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global approval preferences.
    pub preferences: PreferencesSection,
    /// Per-tool permission policy, keyed by tool name.
    pub tools: BTreeMap<String, ToolPermissionConfig>,
    /// Checkpoint retention.
    pub checkpoints: CheckpointSection,
    /// Command execution limits.
    pub executor: ExecutorSection,
    /// Operation log settings.
    pub audit: AuditSection,
    /// Diagnostic logging.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// PreferencesSection
// ---------------------------------------------------------------------------

/// Global approval preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesSection {
    /// Approve low-risk tools without asking.
    pub auto_approve_low_risk: bool,
    /// Ask a human before running tools that require approval.
    pub require_confirmation: bool,
    /// How long to wait for a human decision before denying.
    pub approval_timeout_secs: u64,
}

impl Default for PreferencesSection {
    fn default() -> Self {
        Self {
            auto_approve_low_risk: false,
            require_confirmation: true,
            approval_timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// CheckpointSection
// ---------------------------------------------------------------------------

/// Checkpoint retention limits, applied after every create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointSection {
    /// Maximum number of retained checkpoints.
    pub max_checkpoints: usize,
    /// Maximum checkpoint age in seconds.
    pub max_age_secs: u64,
}

impl Default for CheckpointSection {
    fn default() -> Self {
        Self {
            max_checkpoints: 50,
            max_age_secs: 604_800,
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutorSection
// ---------------------------------------------------------------------------

/// Command execution limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    /// Wall-clock limit for a command before it is killed.
    pub command_timeout_secs: u64,
    /// If set, only these binaries may be executed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_binaries: Option<Vec<String>>,
    /// Captured stdout / stderr are truncated to this many bytes each.
    pub max_output_bytes: usize,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            command_timeout_secs: 60,
            allowed_binaries: None,
            max_output_bytes: 1_048_576,
        }
    }
}

// ---------------------------------------------------------------------------
// AuditSection
// ---------------------------------------------------------------------------

/// Operation log settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    /// Ring buffer capacity.
    pub capacity: usize,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["warden_tools=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

//! Bridge from `warden_config::Config` to component settings.
//!
//! The config crate knows nothing about the components it configures. This
//! module translates its sections into the types each component takes, in
//! one place.

use std::path::Path;
use std::time::Duration;

use warden_approval::ApprovalPreferences;
use warden_checkpoint::RetentionPolicy;
use warden_config::Config;
use warden_tools::ExecutorConfig;

/// Convert `[preferences]` to [`ApprovalPreferences`].
#[must_use]
pub fn to_approval_preferences(cfg: &Config) -> ApprovalPreferences {
    ApprovalPreferences {
        auto_approve_low_risk: cfg.preferences.auto_approve_low_risk,
        require_confirmation: cfg.preferences.require_confirmation,
        timeout: cfg.approval_timeout(),
    }
}

/// Convert `[checkpoints]` to [`RetentionPolicy`].
#[must_use]
pub fn to_retention_policy(cfg: &Config) -> RetentionPolicy {
    RetentionPolicy {
        max_checkpoints: cfg.checkpoints.max_checkpoints,
        max_age: Duration::from_secs(cfg.checkpoints.max_age_secs),
    }
}

/// Convert `[executor]` to [`ExecutorConfig`] rooted at `workspace_root`.
#[must_use]
pub fn to_executor_config(cfg: &Config, workspace_root: &Path) -> ExecutorConfig {
    let mut executor = ExecutorConfig::new(workspace_root)
        .with_command_timeout(cfg.command_timeout())
        .with_max_output_bytes(cfg.executor.max_output_bytes);
    if let Some(binaries) = &cfg.executor.allowed_binaries {
        executor = executor.with_allowed_binaries(binaries.clone());
    }
    executor
}

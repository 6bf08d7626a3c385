//! Post-merge configuration validation.

use warden_workspace::PatternSet;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound for every `*_timeout_secs` field (one hour).
const MAX_TIMEOUT_SECS: u64 = 3600;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_preferences(config)?;
    validate_tools(config)?;
    validate_checkpoints(config)?;
    validate_executor(config)?;
    validate_audit(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn check_timeout(field: &str, secs: u64) -> ConfigResult<()> {
    if secs == 0 || secs > MAX_TIMEOUT_SECS {
        return Err(invalid(
            field,
            format!("timeout must be between 1 and {MAX_TIMEOUT_SECS} seconds, got {secs}"),
        ));
    }
    Ok(())
}

fn validate_preferences(config: &Config) -> ConfigResult<()> {
    check_timeout(
        "preferences.approval_timeout_secs",
        config.preferences.approval_timeout_secs,
    )
}

fn validate_tools(config: &Config) -> ConfigResult<()> {
    for (name, tool) in &config.tools {
        if name.trim().is_empty() {
            return Err(invalid("tools", "tool names must not be empty"));
        }
        let sandbox = &tool.sandbox_constraints;

        if sandbox.max_file_size == Some(0) {
            return Err(invalid(
                format!("tools.{name}.sandbox_constraints.max_file_size"),
                "max_file_size must be greater than zero",
            ));
        }

        let lists = [
            ("auto_approve_patterns", &tool.auto_approve_patterns),
            ("sandbox_constraints.allowed_paths", &sandbox.allowed_paths),
            ("sandbox_constraints.allowed_urls", &sandbox.allowed_urls),
        ];
        for (field, patterns) in lists {
            if let Err(e) = PatternSet::compile(patterns) {
                return Err(invalid(format!("tools.{name}.{field}"), e.to_string()));
            }
        }
    }
    Ok(())
}

fn validate_checkpoints(config: &Config) -> ConfigResult<()> {
    let c = &config.checkpoints;
    if c.max_checkpoints == 0 {
        return Err(invalid(
            "checkpoints.max_checkpoints",
            "max_checkpoints must be at least 1",
        ));
    }
    if c.max_age_secs == 0 {
        return Err(invalid(
            "checkpoints.max_age_secs",
            "max_age_secs must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_executor(config: &Config) -> ConfigResult<()> {
    let e = &config.executor;
    check_timeout("executor.command_timeout_secs", e.command_timeout_secs)?;
    if e.max_output_bytes == 0 {
        return Err(invalid(
            "executor.max_output_bytes",
            "max_output_bytes must be greater than zero",
        ));
    }
    if let Some(binaries) = &e.allowed_binaries {
        if let Some(bad) = binaries
            .iter()
            .find(|b| b.trim().is_empty() || b.chars().any(char::is_whitespace))
        {
            return Err(invalid(
                "executor.allowed_binaries",
                format!("'{bad}' is not a single binary name"),
            ));
        }
    }
    Ok(())
}

fn validate_audit(config: &Config) -> ConfigResult<()> {
    if config.audit.capacity == 0 {
        return Err(invalid("audit.capacity", "capacity must be at least 1"));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;
    if !LOG_LEVELS.contains(&l.level.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: {}",
                l.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }
    if !LOG_FORMATS.contains(&l.format.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: {}",
                l.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::ToolPermissionConfig;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut config = Config::default();
        config.checkpoints.max_checkpoints = 0;
        assert_eq!(field_of(validate(&config)), "checkpoints.max_checkpoints");

        let mut config = Config::default();
        config.audit.capacity = 0;
        assert_eq!(field_of(validate(&config)), "audit.capacity");
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = Config::default();
        config.preferences.approval_timeout_secs = 0;
        assert_eq!(
            field_of(validate(&config)),
            "preferences.approval_timeout_secs"
        );

        let mut config = Config::default();
        config.executor.command_timeout_secs = 3601;
        assert_eq!(field_of(validate(&config)), "executor.command_timeout_secs");

        config.executor.command_timeout_secs = 3600;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_bad_tool_pattern_names_field() {
        let mut config = Config::default();
        config.tools.insert(
            "sandbox_read_file".into(),
            ToolPermissionConfig::new("sandbox_read_file").with_allowed_path("!"),
        );
        assert_eq!(
            field_of(validate(&config)),
            "tools.sandbox_read_file.sandbox_constraints.allowed_paths"
        );
    }

    #[test]
    fn test_zero_max_file_size_rejected() {
        let mut config = Config::default();
        config.tools.insert(
            "w".into(),
            ToolPermissionConfig::new("w").with_max_file_size(0),
        );
        assert_eq!(
            field_of(validate(&config)),
            "tools.w.sandbox_constraints.max_file_size"
        );
    }

    #[test]
    fn test_logging_names() {
        let mut config = Config::default();
        config.logging.level = "verbose".into();
        assert_eq!(field_of(validate(&config)), "logging.level");

        let mut config = Config::default();
        config.logging.format = "JSON".into();
        assert!(validate(&config).is_ok());
        config.logging.format = "xml".into();
        assert_eq!(field_of(validate(&config)), "logging.format");
    }

    #[test]
    fn test_allowed_binaries_must_be_names() {
        let mut config = Config::default();
        config.executor.allowed_binaries = Some(vec!["git".into(), "rm -rf".into()]);
        assert_eq!(field_of(validate(&config)), "executor.allowed_binaries");
    }
}

//! Config file discovery and layered loading.
//!
//! 1. Parse `defaults.toml` → base
//! 2. Merge `~/.warden/config.toml` (user), or `$WARDEN_HOME/config.toml`
//! 3. Merge `{workspace}/.warden/config.toml` with restriction enforcement
//! 4. Apply env var fallbacks for fields still at their default
//! 5. Deserialize and validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::env::{HOME_ENV_VAR, apply_env_fallbacks};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{
    ConfigLayer, FieldSources, deep_merge_tracking, record_all_leaves, restrict_workspace_overlay,
};
use crate::types::Config;
use crate::validate;
use crate::ResolvedConfig;

/// Embedded default configuration.
pub(crate) const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Directory name under home and workspace roots.
const CONFIG_DIR: &str = ".warden";

/// Load configuration with layered file precedence.
///
/// `home_override` is treated as the `.warden` directory itself, bypassing
/// home discovery and `WARDEN_HOME`. `env_vars` is the environment to read
/// fallbacks from.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed or the merged
/// configuration fails validation.
pub fn load<S: ::std::hash::BuildHasher>(
    workspace_root: Option<&Path>,
    home_override: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let (mut merged, mut field_sources) = defaults_tree()?;
    let mut loaded_files = Vec::new();

    let user_path = match home_override {
        Some(dir) => Some(dir.join("config.toml")),
        None => user_config_path(env_vars),
    };
    if let Some(path) = user_path {
        if let Some(overlay) = try_load_file(&path)? {
            deep_merge_tracking(
                &mut merged,
                &overlay,
                "",
                &ConfigLayer::User,
                &mut field_sources,
            );
            info!(path = %path.display(), "loaded user config");
            loaded_files.push(path.display().to_string());
        }
    }

    if let Some(ws_root) = workspace_root {
        let ws_path = ws_root.join(CONFIG_DIR).join("config.toml");
        if let Some(mut overlay) = try_load_file(&ws_path)? {
            restrict_workspace_overlay(&mut overlay);
            deep_merge_tracking(
                &mut merged,
                &overlay,
                "",
                &ConfigLayer::Workspace,
                &mut field_sources,
            );
            info!(path = %ws_path.display(), "loaded workspace config");
            loaded_files.push(ws_path.display().to_string());
        }
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config = finish(merged, "<merged config>")?;
    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a single file layered over the embedded defaults.
///
/// Tool entries in the file replace the default entry of the same name.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is missing, malformed or invalid.
pub fn load_file(path: &Path) -> ConfigResult<ResolvedConfig> {
    let (mut merged, mut field_sources) = defaults_tree()?;
    let Some(overlay) = try_load_file(path)? else {
        return Err(ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
    };
    deep_merge_tracking(
        &mut merged,
        &overlay,
        "",
        &ConfigLayer::User,
        &mut field_sources,
    );
    let config = finish(merged, &path.display().to_string())?;
    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files: vec![path.display().to_string()],
    })
}

/// Parse the embedded defaults into a [`Config`].
///
/// # Errors
///
/// Returns a [`ConfigError`] only if the embedded file is broken.
pub fn builtin() -> ConfigResult<Config> {
    let (merged, _) = defaults_tree()?;
    finish(merged, "<embedded defaults>")
}

fn defaults_tree() -> ConfigResult<(toml::Value, FieldSources)> {
    let merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut sources = FieldSources::new();
    record_all_leaves(&merged, "", &ConfigLayer::Defaults, &mut sources);
    Ok((merged, sources))
}

fn finish(merged: toml::Value, origin: &str) -> ConfigResult<Config> {
    let config: Config = merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: origin.to_owned(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// `~/.warden/config.toml` if it exists, else `$WARDEN_HOME/config.toml`.
fn user_config_path<S: ::std::hash::BuildHasher>(
    env_vars: &HashMap<String, String, S>,
) -> Option<PathBuf> {
    let home = match home_directory() {
        Ok(h) => Some(h.join(CONFIG_DIR).join("config.toml")),
        Err(e) => {
            debug!(error = %e, "skipping home config discovery");
            None
        },
    };
    if let Some(path) = home.filter(|p| p.is_file()) {
        return Some(path);
    }

    let raw = env_vars.get(HOME_ENV_VAR)?;
    match PathBuf::from(raw).canonicalize() {
        Ok(dir) if dir.is_dir() => Some(dir.join("config.toml")),
        _ => {
            warn!(path = raw.as_str(), "WARDEN_HOME is not a directory; ignoring");
            None
        },
    }
}

/// Try to load a file, returning `None` if it doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

//! Layered configuration for warden.
//!
//! A single [`Config`] carries the tool permission policy, approval
//! preferences, checkpoint retention, command limits and logging settings.
//!
//! # Usage
//!
//! ```rust,no_run
//! use warden_config::Config;
//!
//! let root = std::path::Path::new(".");
//! let resolved = Config::load(Some(root)).unwrap();
//! let policy = resolved.config.policy_store(root);
//! println!("{} tools configured", policy.len());
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Workspace** (`{workspace}/.warden/config.toml`): can only *tighten*
//!    preferences and never edits `[tools]`
//! 2. **User** (`~/.warden/config.toml`, or `$WARDEN_HOME/config.toml`)
//! 3. **Environment variables** (`WARDEN_*`): fallback only
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! A `[tools.<name>]` table in a higher layer replaces the whole entry below
//! it rather than merging field by field.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging with precedence.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use warden_core::PolicyStore;

pub use error::{ConfigError, ConfigResult};
pub use merge::{ConfigLayer, FieldSources};
pub use types::*;

/// A loaded configuration plus where each value came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Layer that set each leaf field, keyed by dotted path.
    pub field_sources: FieldSources,
    /// Files that contributed, in load order.
    pub loaded_files: Vec<String>,
}

impl ResolvedConfig {
    /// The layer that set `field` (dotted path), if any.
    #[must_use]
    pub fn source_of(&self, field: &str) -> Option<&ConfigLayer> {
        self.field_sources.get(field)
    }
}

impl Config {
    /// Load configuration with the full precedence chain, reading env
    /// fallbacks from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(workspace_root: Option<&Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(workspace_root, None, &env::collect_env_vars())
    }

    /// Load configuration with an explicit `.warden` directory for the user
    /// layer.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load_with_home(
        workspace_root: Option<&Path>,
        home_dir: &Path,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(workspace_root, Some(home_dir), &env::collect_env_vars())
    }

    /// Load configuration with an injected environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load_with_env<S: ::std::hash::BuildHasher>(
        workspace_root: Option<&Path>,
        home_dir: Option<&Path>,
        env_vars: &HashMap<String, String, S>,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(workspace_root, home_dir, env_vars)
    }

    /// Load one file over the embedded defaults, skipping discovery.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is missing, malformed or invalid.
    pub fn load_file(path: &Path) -> ConfigResult<ResolvedConfig> {
        loader::load_file(path)
    }

    /// The embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] only if the compiled-in defaults are broken.
    pub fn builtin() -> ConfigResult<Self> {
        loader::builtin()
    }

    /// Build the runtime policy store, expanding `{workspace}` to the
    /// canonical form of `workspace_root`.
    #[must_use]
    pub fn policy_store(&self, workspace_root: &Path) -> PolicyStore {
        let root = canonical_root(workspace_root);
        PolicyStore::from_map(self.tools.clone(), &root)
    }

    /// Approval timeout as a [`std::time::Duration`].
    #[must_use]
    pub fn approval_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.preferences.approval_timeout_secs)
    }

    /// Command timeout as a [`std::time::Duration`].
    #[must_use]
    pub fn command_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.executor.command_timeout_secs)
    }

    /// Serialize to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be represented in TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn canonical_root(root: &Path) -> PathBuf {
    warden_workspace::canonicalize(&root.to_string_lossy(), root)
        .unwrap_or_else(|_| root.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_store_expands_workspace() {
        let ws = tempfile::tempdir().unwrap();
        let config = Config::builtin().unwrap();
        let store = config.policy_store(ws.path());

        let read = store.get("sandbox_read_file").unwrap();
        assert_eq!(read.tool, "sandbox_read_file");
        let root = ws.path().canonicalize().unwrap();
        let expected = format!("{}/**", root.display());
        assert!(read.sandbox_constraints.allowed_paths.contains(&expected));
        assert!(
            read.sandbox_constraints
                .allowed_paths
                .iter()
                .all(|p| !p.contains("{workspace}"))
        );
    }

    #[test]
    fn test_toml_round_trip_keeps_tools() {
        let config = Config::builtin().unwrap();
        let text = config.to_toml_string().unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.tools.len(), config.tools.len());
    }
}

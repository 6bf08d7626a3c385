//! Declarative tool policy.
//!
//! A [`PolicyStore`] maps tool names to their [`ToolPermissionConfig`]. It is
//! built once (defaults plus optional overrides) and is read-only afterwards;
//! clones share the same underlying map.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use crate::types::RiskLevel;

/// Placeholder expanded to the workspace root inside allow patterns.
pub const WORKSPACE_PLACEHOLDER: &str = "{workspace}";

/// Declarative restrictions attached to a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConstraints {
    /// Glob patterns or plain directories a path parameter must fall under.
    /// Entries starting with `!` exclude. Empty means no path is allowed.
    pub allowed_paths: Vec<String>,
    /// Glob patterns a URL parameter must match. Entries starting with `!`
    /// exclude. Empty means no URL is allowed.
    pub allowed_urls: Vec<String>,
    /// Maximum size in bytes of content written by the tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,
}

/// Permission configuration for a single tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPermissionConfig {
    /// Tool name. Filled from the map key when loaded from configuration.
    #[serde(default)]
    pub tool: String,
    /// Whether the tool needs a human decision before it runs.
    #[serde(default = "default_requires_approval")]
    pub requires_approval: bool,
    /// Risk classification.
    #[serde(default)]
    pub risk_level: RiskLevel,
    /// Patterns that, when matched by the request's subject, skip confirmation.
    #[serde(default)]
    pub auto_approve_patterns: Vec<String>,
    /// Sandbox constraints.
    #[serde(default)]
    pub sandbox_constraints: SandboxConstraints,
}

const fn default_requires_approval() -> bool {
    true
}

impl ToolPermissionConfig {
    /// A config for `tool` that requires approval at medium risk with no
    /// sandbox allowances.
    #[must_use]
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            requires_approval: true,
            risk_level: RiskLevel::default(),
            auto_approve_patterns: Vec::new(),
            sandbox_constraints: SandboxConstraints::default(),
        }
    }

    /// Set whether approval is required.
    #[must_use]
    pub fn with_requires_approval(mut self, requires: bool) -> Self {
        self.requires_approval = requires;
        self
    }

    /// Set the risk level.
    #[must_use]
    pub fn with_risk_level(mut self, level: RiskLevel) -> Self {
        self.risk_level = level;
        self
    }

    /// Add an auto-approve pattern.
    #[must_use]
    pub fn with_auto_approve(mut self, pattern: impl Into<String>) -> Self {
        self.auto_approve_patterns.push(pattern.into());
        self
    }

    /// Add an allowed path pattern.
    #[must_use]
    pub fn with_allowed_path(mut self, pattern: impl Into<String>) -> Self {
        self.sandbox_constraints.allowed_paths.push(pattern.into());
        self
    }

    /// Add an allowed URL pattern.
    #[must_use]
    pub fn with_allowed_url(mut self, pattern: impl Into<String>) -> Self {
        self.sandbox_constraints.allowed_urls.push(pattern.into());
        self
    }

    /// Set the maximum content size.
    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.sandbox_constraints.max_file_size = Some(bytes);
        self
    }

    /// Replace `{workspace}` in every pattern with `root`.
    #[must_use]
    pub fn expand_workspace(mut self, root: &Path) -> Self {
        let root = root.to_string_lossy();
        let root = root.trim_end_matches('/');
        let expand = |patterns: &mut Vec<String>| {
            for p in patterns.iter_mut() {
                if p.contains(WORKSPACE_PLACEHOLDER) {
                    *p = p.replace(WORKSPACE_PLACEHOLDER, root);
                }
            }
        };
        expand(&mut self.sandbox_constraints.allowed_paths);
        expand(&mut self.sandbox_constraints.allowed_urls);
        expand(&mut self.auto_approve_patterns);
        self
    }
}

/// Immutable map of tool name to permission config.
#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    tools: Arc<HashMap<String, Arc<ToolPermissionConfig>>>,
}

impl PolicyStore {
    /// Build a store from configs, keyed by their `tool` field.
    #[must_use]
    pub fn new(configs: impl IntoIterator<Item = ToolPermissionConfig>) -> Self {
        let tools = configs
            .into_iter()
            .map(|c| (c.tool.clone(), Arc::new(c)))
            .collect();
        Self {
            tools: Arc::new(tools),
        }
    }

    /// Build a store from a name-keyed map, as found in configuration files.
    ///
    /// Each config's `tool` field is set from its key and `{workspace}` is
    /// expanded to `workspace_root`.
    #[must_use]
    pub fn from_map(map: BTreeMap<String, ToolPermissionConfig>, workspace_root: &Path) -> Self {
        Self::new(map.into_iter().map(|(name, mut cfg)| {
            cfg.tool = name;
            cfg.expand_workspace(workspace_root)
        }))
    }

    /// Return a new store where each override replaces the entry of the same
    /// name (or adds it).
    #[must_use]
    pub fn with_overrides(&self, overrides: impl IntoIterator<Item = ToolPermissionConfig>) -> Self {
        let mut tools: HashMap<_, _> = (*self.tools).clone();
        for cfg in overrides {
            tools.insert(cfg.tool.clone(), Arc::new(cfg));
        }
        Self {
            tools: Arc::new(tools),
        }
    }

    /// Look up a tool's config.
    #[must_use]
    pub fn get(&self, tool: &str) -> Option<Arc<ToolPermissionConfig>> {
        self.tools.get(tool).cloned()
    }

    /// Whether a tool is known.
    #[must_use]
    pub fn contains(&self, tool: &str) -> bool {
        self.tools.contains_key(tool)
    }

    /// All tool names, sorted.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// All configs, sorted by tool name.
    #[must_use]
    pub fn configs(&self) -> Vec<Arc<ToolPermissionConfig>> {
        let mut configs: Vec<_> = self.tools.values().cloned().collect();
        configs.sort_by(|a, b| a.tool.cmp(&b.tool));
        configs
    }

    /// Number of tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_deserialize_defaults() {
        let cfg: ToolPermissionConfig = parse_config(r#"{"risk_level": "low"}"#);
        assert!(cfg.requires_approval);
        assert_eq!(cfg.risk_level, RiskLevel::Low);
        assert!(cfg.sandbox_constraints.allowed_paths.is_empty());
        assert!(cfg.sandbox_constraints.max_file_size.is_none());
    }

    fn parse_config(json: &str) -> ToolPermissionConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_from_map_fills_names_and_expands_workspace() {
        let mut map = BTreeMap::new();
        map.insert(
            "sandbox_write_file".to_string(),
            ToolPermissionConfig::new("")
                .with_allowed_path("{workspace}/**")
                .with_allowed_path("!**/.env"),
        );
        let store = PolicyStore::from_map(map, &PathBuf::from("/proj/"));
        let cfg = store.get("sandbox_write_file").unwrap();
        assert_eq!(cfg.tool, "sandbox_write_file");
        assert_eq!(
            cfg.sandbox_constraints.allowed_paths,
            vec!["/proj/**".to_string(), "!**/.env".to_string()]
        );
    }

    #[test]
    fn test_overrides_replace_whole_entry() {
        let base = PolicyStore::new([ToolPermissionConfig::new("a")
            .with_risk_level(RiskLevel::High)
            .with_allowed_path("/x/**")]);
        let over = base.with_overrides([ToolPermissionConfig::new("a")
            .with_requires_approval(false)
            .with_risk_level(RiskLevel::Low)]);

        let cfg = over.get("a").unwrap();
        assert!(!cfg.requires_approval);
        assert!(cfg.sandbox_constraints.allowed_paths.is_empty());
        // Original untouched.
        assert_eq!(base.get("a").unwrap().risk_level, RiskLevel::High);
    }

    #[test]
    fn test_lookup_and_names() {
        let store = PolicyStore::new([
            ToolPermissionConfig::new("b"),
            ToolPermissionConfig::new("a"),
        ]);
        assert_eq!(store.len(), 2);
        assert!(store.contains("a"));
        assert!(!store.contains("c"));
        assert_eq!(store.tool_names(), vec!["a", "b"]);
        assert!(PolicyStore::default().is_empty());
    }
}

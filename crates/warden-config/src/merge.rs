//! Deep merge of TOML values with restriction enforcement.
//!
//! The merge operates on raw [`toml::Value`] trees rather than deserialized
//! structs, so a key missing from an overlay never overrides the base layer.

use std::collections::HashMap;
use tracing::warn;

/// Which configuration layer a value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// User-level configuration (`~/.warden/config.toml`).
    User,
    /// Workspace-level configuration (`{workspace}/.warden/config.toml`).
    Workspace,
    /// Environment variable fallback.
    Environment,
}

impl std::fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::User => write!(f, "user (~/.warden/config.toml)"),
            Self::Workspace => write!(f, "workspace (.warden/config.toml)"),
            Self::Environment => write!(f, "environment variable"),
        }
    }
}

/// Tracks which layer set each field's value.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// Deep-merge `overlay` into `base`, recording which layer set each leaf
/// field.
///
/// Tables merge recursively, except entries under `tools`, which the overlay
/// replaces whole. Scalars and arrays from the overlay replace the base value.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                let replaces_whole = prefix == "tools";

                match base_table.get_mut(key) {
                    Some(base_val) if overlay_val.is_table() && !replaces_whole => {
                        deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                    },
                    _ => {
                        if replaces_whole {
                            sources.retain(|k, _| !k.starts_with(&format!("{path}.")));
                        }
                        base_table.insert(key.clone(), overlay_val.clone());
                        record_all_leaves(overlay_val, &path, layer, sources);
                    },
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            sources.insert(prefix.to_owned(), layer.clone());
        },
    }
}

/// Walk a value tree and record all leaf paths with their source layer.
pub(crate) fn record_all_leaves(
    val: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            record_all_leaves(child, &path, layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer.clone());
    }
}

/// Strip what a workspace overlay may not change before it is merged.
///
/// A repository's own config file must not loosen the policy it runs under:
/// it cannot edit tool policy, cannot turn `require_confirmation` off and
/// cannot turn `auto_approve_low_risk` on.
pub fn restrict_workspace_overlay(overlay: &mut toml::Value) {
    let Some(table) = overlay.as_table_mut() else {
        return;
    };

    if table.remove("tools").is_some() {
        warn!("Workspace config tried to change tool policy; ignoring [tools]");
    }

    let Some(prefs) = table
        .get_mut("preferences")
        .and_then(toml::Value::as_table_mut)
    else {
        return;
    };

    if prefs.get("require_confirmation").and_then(toml::Value::as_bool) == Some(false) {
        warn!(
            "Workspace config tried to disable preferences.require_confirmation; \
             workspace can only tighten"
        );
        prefs.remove("require_confirmation");
    }
    if prefs.get("auto_approve_low_risk").and_then(toml::Value::as_bool) == Some(true) {
        warn!(
            "Workspace config tried to enable preferences.auto_approve_low_risk; \
             workspace can only tighten"
        );
        prefs.remove("auto_approve_low_risk");
    }
}

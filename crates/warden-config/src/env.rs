//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only apply to fields that
//! no config file set.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::merge::{ConfigLayer, FieldSources};

/// Variable that relocates the user-level config directory.
pub const HOME_ENV_VAR: &str = "WARDEN_HOME";

struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: ValueKind,
}

#[derive(Clone, Copy)]
enum ValueKind {
    Str,
    Bool,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "WARDEN_LOG_LEVEL",
        field_path: "logging.level",
        kind: ValueKind::Str,
    },
    EnvMapping {
        var_name: "WARDEN_LOG_FORMAT",
        field_path: "logging.format",
        kind: ValueKind::Str,
    },
    EnvMapping {
        var_name: "WARDEN_AUTO_APPROVE_LOW_RISK",
        field_path: "preferences.auto_approve_low_risk",
        kind: ValueKind::Bool,
    },
    EnvMapping {
        var_name: "WARDEN_REQUIRE_CONFIRMATION",
        field_path: "preferences.require_confirmation",
        kind: ValueKind::Bool,
    },
];

/// Apply environment fallbacks to fields still at their default.
///
/// Returns the number of variables applied. Unparseable booleans are
/// skipped with a warning.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let set_by_file = sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults);
        if set_by_file {
            continue;
        }
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };
        let Some(value) = coerce(mapping.kind, raw) else {
            warn!(
                var = mapping.var_name,
                value = raw.as_str(),
                "ignoring env var with non-boolean value"
            );
            continue;
        };

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_field(merged, mapping.field_path, value);
        sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
        count = count.saturating_add(1);
    }

    count
}

/// Snapshot the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

fn coerce(kind: ValueKind, raw: &str) -> Option<toml::Value> {
    match kind {
        ValueKind::Str => Some(toml::Value::String(raw.to_owned())),
        ValueKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(toml::Value::Boolean(true)),
            "0" | "false" | "no" | "off" => Some(toml::Value::Boolean(false)),
            _ => None,
        },
    }
}

fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut current = root;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), value);
            return;
        }
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_fallback_applies_over_defaults() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"info\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::Defaults);

        let env = make_env(&[("WARDEN_LOG_LEVEL", "debug")]);
        assert_eq!(apply_env_fallbacks(&mut merged, &mut sources, &env), 1);
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(sources["logging.level"], ConfigLayer::Environment);
    }

    #[test]
    fn test_file_value_wins_over_env() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"warn\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::User);

        let env = make_env(&[("WARDEN_LOG_LEVEL", "debug")]);
        assert_eq!(apply_env_fallbacks(&mut merged, &mut sources, &env), 0);
        assert_eq!(merged["logging"]["level"].as_str(), Some("warn"));
    }

    #[test]
    fn test_bool_coercion_and_missing_tables() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let mut sources = FieldSources::new();
        let env = make_env(&[
            ("WARDEN_AUTO_APPROVE_LOW_RISK", "Yes"),
            ("WARDEN_REQUIRE_CONFIRMATION", "maybe"),
        ]);
        assert_eq!(apply_env_fallbacks(&mut merged, &mut sources, &env), 1);
        assert_eq!(
            merged["preferences"]["auto_approve_low_risk"].as_bool(),
            Some(true)
        );
        assert!(merged["preferences"].get("require_confirmation").is_none());
    }
}

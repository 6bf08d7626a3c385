//! Process-lifetime memory of "always allow" answers.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;
use tracing::{debug, warn};
use warden_core::canonical_json;

use crate::request::UserChoice;

/// Key for a remembered choice: the tool plus its parameters in
/// canonical JSON, so key order in `params` never matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RememberKey {
    tool: String,
    params: String,
}

impl RememberKey {
    /// Build the key for a call.
    #[must_use]
    pub fn new(tool: &str, params: &Value) -> Self {
        Self {
            tool: tool.to_string(),
            params: canonical_json(params),
        }
    }
}

/// Thread-safe store of remembered approvals.
#[derive(Debug, Default)]
pub struct RememberedChoices {
    choices: RwLock<HashMap<RememberKey, UserChoice>>,
}

impl RememberedChoices {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember an approval for an exact call.
    pub fn remember(&self, tool: &str, params: &Value, choice: UserChoice) {
        let key = RememberKey::new(tool, params);
        debug!(tool, ?choice, "remembering approval");
        self.choices
            .write()
            .unwrap_or_else(|e| {
                warn!("RememberedChoices lock poisoned, recovering");
                e.into_inner()
            })
            .insert(key, choice);
    }

    /// The remembered choice for a call, if any.
    #[must_use]
    pub fn lookup(&self, tool: &str, params: &Value) -> Option<UserChoice> {
        let key = RememberKey::new(tool, params);
        self.choices
            .read()
            .unwrap_or_else(|e| {
                warn!("RememberedChoices lock poisoned, recovering");
                e.into_inner()
            })
            .get(&key)
            .copied()
    }

    /// Forget one call. Returns `true` if it was remembered.
    pub fn forget(&self, tool: &str, params: &Value) -> bool {
        let key = RememberKey::new(tool, params);
        self.choices
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&key)
            .is_some()
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.choices
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }

    /// Number of remembered calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.choices
            .read()
            .map(|c| c.len())
            .unwrap_or_default()
    }

    /// Whether nothing is remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_ignores_param_order() {
        let store = RememberedChoices::new();
        store.remember(
            "sandbox_write_file",
            &json!({"path": "a.txt", "content": "x"}),
            UserChoice::Always,
        );
        assert_eq!(
            store.lookup("sandbox_write_file", &json!({"content": "x", "path": "a.txt"})),
            Some(UserChoice::Always)
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_key_distinguishes_tool_and_values() {
        let store = RememberedChoices::new();
        store.remember("a", &json!({"path": "x"}), UserChoice::Always);
        assert!(store.lookup("b", &json!({"path": "x"})).is_none());
        assert!(store.lookup("a", &json!({"path": "y"})).is_none());
    }

    #[test]
    fn test_forget_and_clear() {
        let store = RememberedChoices::new();
        store.remember("a", &json!({}), UserChoice::Always);
        store.remember("b", &json!({}), UserChoice::Always);
        assert!(store.forget("a", &json!({})));
        assert!(!store.forget("a", &json!({})));
        store.clear();
        assert!(store.is_empty());
    }
}

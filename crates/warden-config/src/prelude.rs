//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_config::prelude::*;` to import all essential types.

pub use crate::{Config, ConfigError, ConfigLayer, ConfigResult, ResolvedConfig};

pub use crate::{
    AuditSection, CheckpointSection, ExecutorSection, LoggingSection, PreferencesSection,
};

//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_runtime::prelude::*;` to import all essential types.

pub use crate::{DispatchOutcome, Dispatcher, DispatcherConfig, RuntimeError, RuntimeResult};

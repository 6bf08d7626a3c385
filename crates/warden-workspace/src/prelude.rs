//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_workspace::prelude::*;` to import all essential types.

// Errors
pub use crate::{WorkspaceError, WorkspaceResult};

// Matching
pub use crate::{PathRules, Pattern, PatternSet, RuleCheck, UrlRules};

// Request checks
pub use crate::{
    CheckedRequest, Violation, canonicalize, check_path, check_request, check_size, check_url,
};

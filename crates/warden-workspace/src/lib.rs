//! Warden Workspace - Sandbox constraints for tool calls.
//!
//! This crate decides whether a path, URL or payload falls inside a tool's
//! [`SandboxConstraints`](warden_core::SandboxConstraints):
//!
//! - **Canonicalization**: paths are made absolute, normalized and resolved
//!   through symlinks before any comparison
//! - **Patterns**: `**` crosses separators, `*` stays within one segment, `?`
//!   is one character, a leading `!` excludes; everything else is literal
//! - **Directories**: plain allow entries cover the directory itself and its
//!   strict descendants only
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_workspace::PathRules;
//!
//! let rules = PathRules::compile(&["/proj/**".into(), "!**/.env".into()])?;
//! assert!(rules.check(Path::new("/proj/src/main.rs")).is_allowed());
//! assert!(!rules.check(Path::new("/proj/.env")).is_allowed());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod canonical;
pub mod constraints;
pub mod error;
pub mod pattern;
pub mod rules;

pub use canonical::canonicalize;
pub use constraints::{
    CheckedRequest, Violation, check_path, check_request, check_size, check_url,
};
pub use error::{WorkspaceError, WorkspaceResult};
pub use pattern::{Pattern, PatternSet};
pub use rules::{PathRules, RuleCheck, UrlRules, parse_url};

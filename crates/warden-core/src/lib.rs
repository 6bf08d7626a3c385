//! Warden Core - Shared types for the tool-call mediation runtime.
//!
//! This crate provides the vocabulary every other warden crate speaks:
//!
//! - [`ToolCallRequest`] and [`RequestSource`]: what the agent asks for
//! - [`RiskLevel`] and [`Timestamp`]: common value types
//! - [`OpResult`], [`OpError`] and [`ErrorKind`]: the structured
//!   `{success, data?, error?}` envelope returned across component boundaries
//! - [`ToolPermissionConfig`], [`SandboxConstraints`] and [`PolicyStore`]:
//!   the declarative policy every request is checked against
//! - [`ContentHash`]: BLAKE3 hashing for snapshot verification
//!
//! # Example
//!
//! ```
//! use warden_core::{PolicyStore, RiskLevel, ToolPermissionConfig};
//!
//! let store = PolicyStore::new([ToolPermissionConfig::new("sandbox_read_file")
//!     .with_risk_level(RiskLevel::Low)]);
//!
//! assert!(store.contains("sandbox_read_file"));
//! assert!(store.get("rm_rf").is_none());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod error;
pub mod hash;
pub mod params;
pub mod policy;
pub mod types;

pub use error::{ErrorKind, OpError, OpResult};
pub use hash::ContentHash;
pub use params::canonical_json;
pub use policy::{PolicyStore, SandboxConstraints, ToolPermissionConfig};
pub use types::{RequestSource, RiskLevel, Timestamp, ToolCallRequest};

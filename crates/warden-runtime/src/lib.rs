//! Warden Runtime - the tool-call dispatcher.
//!
//! [`Dispatcher`] owns one instance of every mediation component, wired
//! together explicitly:
//!
//! - [`ApprovalEngine`](warden_approval::ApprovalEngine) decides whether a call may run
//! - [`OperationExecutor`](warden_tools::OperationExecutor) performs it
//! - [`CheckpointManager`](warden_checkpoint::CheckpointManager) and
//!   [`RollbackEngine`](warden_checkpoint::RollbackEngine) make writes reversible
//! - [`OperationLogger`](warden_audit::OperationLogger) records every step
//!
//! # Example
//!
//! ```rust,no_run
//! use warden_config::Config;
//! use warden_core::ToolCallRequest;
//! use warden_runtime::Dispatcher;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let root = std::env::current_dir()?;
//! let resolved = Config::load(Some(root.as_path()))?;
//! let dispatcher = Dispatcher::from_config(&resolved.config, &root)?;
//!
//! let outcome = dispatcher
//!     .dispatch(ToolCallRequest::new(
//!         "sandbox_read_file",
//!         serde_json::json!({"path": "README.md"}),
//!     ))
//!     .await;
//! println!("{}", outcome.decision.reason);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config_bridge;
pub mod prelude;

mod dispatcher;
mod error;

pub use dispatcher::{DispatchOutcome, Dispatcher, DispatcherConfig};
pub use error::{RuntimeError, RuntimeResult};

//! Runtime error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while assembling a dispatcher.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration could not be loaded or validated.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] warden_config::ConfigError),

    /// The workspace root is unusable.
    #[error("Invalid workspace root {}: {source}", .path.display())]
    InvalidWorkspace {
        /// The root given.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for runtime setup.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

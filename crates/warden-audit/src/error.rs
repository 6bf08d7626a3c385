use thiserror::Error;

/// Errors that can occur in the operation log.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Serialization failed during export.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An export format name was not recognized.
    #[error("unknown export format: {0}")]
    UnknownFormat(String),
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

//! Structured operation results.
//!
//! Executor, checkpoint and rollback entry points never return `Err` across
//! their public boundary. They hand back an [`OpResult`] carrying either data
//! or an [`OpError`] classified by [`ErrorKind`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// Classification of an operation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown tool, sandbox-constraint failure, size limit exceeded.
    PolicyViolation,
    /// Malformed path or dangerous command pattern.
    ValidationFailure,
    /// Missing file, snapshot or checkpoint.
    ResourceNotFound,
    /// The OS refused access to a resource.
    PermissionDenied,
    /// Nonzero exit code, spawn error, I/O failure.
    ExecutionFailure,
    /// Approval or command timed out.
    Timeout,
    /// Unexpected fault, e.g. during cleanup.
    Internal,
}

impl ErrorKind {
    /// Snake-case name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PolicyViolation => "policy_violation",
            Self::ValidationFailure => "validation_failure",
            Self::ResourceNotFound => "resource_not_found",
            Self::PermissionDenied => "permission_denied",
            Self::ExecutionFailure => "execution_failure",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified operation failure with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct OpError {
    /// Failure class.
    pub kind: ErrorKind,
    /// Human-readable explanation.
    pub message: String,
}

impl OpError {
    /// Create an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A policy violation.
    #[must_use]
    pub fn policy_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PolicyViolation, message)
    }

    /// A validation failure.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationFailure, message)
    }

    /// A missing resource.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceNotFound, message)
    }

    /// Access refused by the operating system.
    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    /// An execution failure.
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExecutionFailure, message)
    }

    /// A timeout.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// An internal fault.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Classify an I/O error encountered while working on `context`.
    #[must_use]
    pub fn from_io(err: &io::Error, context: impl fmt::Display) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => ErrorKind::ResourceNotFound,
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::ExecutionFailure,
        };
        Self::new(kind, format!("{context}: {err}"))
    }
}

/// The `{success, data?, error?}` envelope.
///
/// A failed result may still carry data, e.g. a command that ran but exited
/// nonzero keeps its captured output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpResult<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Payload, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OpError>,
}

impl<T> OpResult<T> {
    /// A successful result.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failed result with no data.
    #[must_use]
    pub fn err(error: OpError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    /// A failed result that still carries data.
    #[must_use]
    pub fn failed_with(data: T, error: OpError) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(error),
        }
    }

    /// Whether the operation succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.success
    }

    /// The error kind, if the operation failed.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Convert into a plain `Result`, dropping data attached to a failure.
    ///
    /// # Errors
    ///
    /// Returns the carried error, or an internal error if a successful result
    /// has no data.
    pub fn into_result(self) -> Result<T, OpError> {
        match (self.success, self.data, self.error) {
            (true, Some(data), _) => Ok(data),
            (_, _, Some(err)) => Err(err),
            (true, None, None) => Err(OpError::internal("successful result carried no data")),
            (false, _, None) => Err(OpError::internal("failed result carried no error")),
        }
    }

    /// Map the payload.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OpResult<U> {
        OpResult {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
        }
    }
}

impl<T> From<Result<T, OpError>> for OpResult<T> {
    fn from(result: Result<T, OpError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::err(err),
        }
    }
}

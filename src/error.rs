//! Error types for document set construction.

use thiserror::Error;

/// The error type for all document set operations.
#[derive(Error, Debug)]
pub enum DocSetError {
    /// A caller passed a value outside the accepted domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The query execution layer ran out of its time or memory budget.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// An internal invariant was broken. This always indicates a bug.
    #[error("Internal invariant violated: {0}")]
    Internal(String),

    /// Configuration could not be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// Result type alias for document set operations.
pub type Result<T> = std::result::Result<T, DocSetError>;

impl DocSetError {
    /// Create an invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        DocSetError::InvalidArgument(msg.into())
    }

    /// Create a resource exhausted error.
    pub fn resource_exhausted<S: Into<String>>(msg: S) -> Self {
        DocSetError::ResourceExhausted(msg.into())
    }

    /// Create an internal invariant violation.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        DocSetError::Internal(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        DocSetError::InvalidConfig(msg.into())
    }

    /// Create a generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        DocSetError::Other(msg.into())
    }

    /// Returns true if the error was raised by an exhausted budget.
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, DocSetError::ResourceExhausted(_))
    }

    /// Returns true if the error signals a broken internal invariant.
    pub fn is_internal(&self) -> bool {
        matches!(self, DocSetError::Internal(_))
    }

    /// Returns true if the error was caused by a bad argument.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, DocSetError::InvalidArgument(_))
    }
}

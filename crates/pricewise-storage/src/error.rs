//! Storage error types.

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Policy not found.
    #[error("discount policy not found: {policy_id}")]
    PolicyNotFound { policy_id: String },

    /// A policy with the same id already exists.
    #[error("discount policy already exists: {policy_id}")]
    DuplicatePolicy { policy_id: String },

    /// Database connection error.
    #[error("database connection error: {message}")]
    ConnectionError { message: String },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

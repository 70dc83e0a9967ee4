//! Domain error types for discount resolution.

use thiserror::Error;

/// Domain-specific errors for discount resolution.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A snapshot violates one of its invariants.
    #[error("invalid discount snapshot {key}: {message}")]
    InvalidSnapshot { key: String, message: String },

    /// The policy system of record could not be queried.
    #[error("policy repository unavailable: {message}")]
    RepositoryUnavailable { message: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Errors raised by a policy cache store.
///
/// These never escape the resolution pipeline: a read failure is treated as a
/// miss and a write failure as a no-op.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store could not be reached.
    #[error("cache unavailable: {message}")]
    Unavailable { message: String },

    /// A cached payload could not be encoded or decoded.
    #[error("cache serialization error for {key}: {message}")]
    Serialization { key: String, message: String },
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

//! Store error types.

use std::fmt;

/// Store operation errors.
#[derive(Debug)]
pub enum StoreError {
    /// Connection to the store backend failed.
    Connection(String),
    /// Serialization/deserialization error.
    Serialization(String),
    /// Key not found, expired, or already consumed.
    NotFound,
    /// Store operation exceeded its deadline.
    Timeout,
    /// Invalid store configuration.
    Configuration(String),
    /// Internal store error.
    Internal(String),
}

impl StoreError {
    /// Returns true if the backend could not serve the request at all.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "store connection error: {msg}"),
            Self::Serialization(msg) => write!(f, "store serialization error: {msg}"),
            Self::NotFound => write!(f, "key not found in store"),
            Self::Timeout => write!(f, "store operation timed out"),
            Self::Configuration(msg) => write!(f, "store configuration error: {msg}"),
            Self::Internal(msg) => write!(f, "internal store error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

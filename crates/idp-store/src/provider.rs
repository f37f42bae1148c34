//! Key-value store provider trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreResult;

/// Key-value store with TTL and atomic get-and-delete.
///
/// Implementations must be thread-safe and support concurrent access.
/// Values are opaque strings; typed access lives in [`crate::IdpStore`].
///
/// `get_del` must be atomic at the granularity of a single key: of any number
/// of concurrent callers for the same key, at most one observes the value.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Gets a value.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Sets a value that expires after `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()>;

    /// Gets and deletes a value atomically.
    ///
    /// Returns `None` if the key doesn't exist, has expired, or was already taken.
    async fn get_del(&self, key: &str) -> StoreResult<Option<String>>;

    /// Deletes a value.
    ///
    /// Returns `Ok(())` even if the key doesn't exist.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> StoreResult<()>;
}

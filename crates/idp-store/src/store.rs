//! Typed access to the artifact and session key spaces.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::provider::KeyValueStore;

/// Key prefix for pending artifact responses.
pub const ARTIFACT_PREFIX: &str = "artifact:";

/// Key prefix for SSO sessions.
pub const SESSION_PREFIX: &str = "session:";

/// Artifact and session storage over a shared [`KeyValueStore`].
///
/// Every backend call is bounded by `deadline`; an elapsed deadline is
/// reported as [`StoreError::Timeout`].
#[derive(Clone)]
pub struct IdpStore {
    backend: Arc<dyn KeyValueStore>,
    deadline: Duration,
}

impl std::fmt::Debug for IdpStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdpStore")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl IdpStore {
    /// Creates a store over `backend` with a per-operation deadline.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>, deadline: Duration) -> Self {
        Self { backend, deadline }
    }

    /// Returns the per-operation deadline.
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    async fn bounded<T>(&self, op: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        match tokio::time::timeout(self.deadline, op).await {
            Ok(result) => result,
            Err(_) => {
                warn!(deadline_ms = self.deadline.as_millis(), "Store operation timed out");
                Err(StoreError::Timeout)
            }
        }
    }

    /// Stores a serialized response under an artifact handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the deadline elapses.
    pub async fn put_artifact(&self, handle: &str, response: &str, ttl: Duration) -> StoreResult<()> {
        let key = artifact_key(handle);
        self.bounded(self.backend.set(&key, response.to_string(), ttl))
            .await?;
        debug!(ttl_secs = ttl.as_secs(), "Stored artifact");
        Ok(())
    }

    /// Takes the response stored under an artifact handle.
    ///
    /// The entry is removed in the same operation, so a handle resolves at
    /// most once.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the handle is unknown, expired, or
    /// already resolved. Other variants indicate the backend is unavailable.
    pub async fn take_artifact(&self, handle: &str) -> StoreResult<String> {
        let key = artifact_key(handle);
        self.bounded(self.backend.get_del(&key))
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Stores session data under a session token.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend fails.
    pub async fn put_session<P>(&self, token: &str, payload: &P, ttl: Duration) -> StoreResult<()>
    where
        P: Serialize + Sync,
    {
        let json = serde_json::to_string(payload)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let key = session_key(token);
        self.bounded(self.backend.set(&key, json, ttl)).await
    }

    /// Looks up session data by token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the token is unknown or expired.
    pub async fn get_session<P>(&self, token: &str) -> StoreResult<P>
    where
        P: DeserializeOwned,
    {
        let key = session_key(token);
        let json = self
            .bounded(self.backend.get(&key))
            .await?
            .ok_or(StoreError::NotFound)?;
        serde_json::from_str(&json).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Checks backend reachability.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable.
    pub async fn ping(&self) -> StoreResult<()> {
        self.bounded(self.backend.ping()).await
    }
}

fn artifact_key(handle: &str) -> String {
    format!("{ARTIFACT_PREFIX}{handle}")
}

fn session_key(token: &str) -> String {
    format!("{SESSION_PREFIX}{token}")
}

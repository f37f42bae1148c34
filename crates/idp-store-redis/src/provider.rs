//! Redis key-value store implementation.

use std::time::Duration;

use async_trait::async_trait;
use fred::prelude::*;
use idp_store::{KeyValueStore, StoreError, StoreResult};
use tracing::info;

use crate::config::RedisConfig;
use crate::error::from_redis_error;

/// Redis-backed [`KeyValueStore`].
pub struct RedisStore {
    client: Client,
    config: RedisConfig,
}

impl RedisStore {
    /// Connects to Redis.
    ///
    /// ## Errors
    ///
    /// Returns an error if the URL is invalid or the connection cannot be established.
    pub async fn connect(config: RedisConfig) -> StoreResult<Self> {
        let redis_config = Config::from_url(&config.url)
            .map_err(|e| StoreError::Configuration(e.to_string()))?;

        let client = Client::new(
            redis_config,
            None,
            None,
            Some(ReconnectPolicy::new_exponential(0, 1000, 30_000, 2)),
        );

        client.init().await.map_err(from_redis_error)?;
        info!(url = %config.redacted_url(), prefix = %config.key_prefix, "Connected to Redis store");

        Ok(Self { client, config })
    }

    /// Returns the underlying Redis client.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    fn key(&self, key: &str) -> String {
        self.config.prefixed_key(key)
    }
}

/// Whole seconds for `EX`, never zero.
#[allow(clippy::cast_possible_wrap)]
fn expiry_seconds(ttl: Duration) -> i64 {
    ttl.as_secs().max(1) as i64
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let key = self.key(key);
        self.client.get(&key).await.map_err(from_redis_error)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        let key = self.key(key);
        self.client
            .set::<(), _, _>(
                &key,
                value,
                Some(Expiration::EX(expiry_seconds(ttl))),
                None,
                false,
            )
            .await
            .map_err(from_redis_error)
    }

    async fn get_del(&self, key: &str) -> StoreResult<Option<String>> {
        let key = self.key(key);
        self.client.getdel(&key).await.map_err(from_redis_error)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let key = self.key(key);
        self.client
            .del::<(), _>(&key)
            .await
            .map_err(from_redis_error)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.client
            .ping::<()>(None)
            .await
            .map_err(from_redis_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_rounds_up_to_one_second() {
        assert_eq!(expiry_seconds(Duration::from_millis(10)), 1);
        assert_eq!(expiry_seconds(Duration::from_secs(60)), 60);
    }

    #[tokio::test]
    async fn invalid_url_is_configuration_error() {
        let config = RedisConfig::from_url("not a url");
        let result = RedisStore::connect(config).await;
        assert!(matches!(result, Err(StoreError::Configuration(_))));
    }
}

//! # idp-store-redis
//!
//! Redis backend for the identity provider store, built on `fred`.
//!
//! Artifact resolution relies on Redis `GETDEL`, so a handle can be taken
//! exactly once across every node sharing the same Redis.
//!
//! ## Example
//!
//! ```ignore
//! use idp_store::IdpStore;
//! use idp_store_redis::{RedisConfig, RedisStore};
//! use std::{sync::Arc, time::Duration};
//!
//! let config = RedisConfig::from_url("redis://localhost:6379/0");
//! let backend = RedisStore::connect(config).await?;
//! let store = IdpStore::new(Arc::new(backend), Duration::from_secs(2));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod provider;

pub use config::RedisConfig;
pub use provider::RedisStore;

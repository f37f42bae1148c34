//! # idp-store
//!
//! Shared key-value storage for the identity provider.
//!
//! One backing store serves two key spaces:
//!
//! - `artifact:` - signed responses awaiting a single ArtifactResolve
//! - `session:` - SSO session tokens mapped to an authenticated principal
//!
//! ## Store Providers
//!
//! - [`KeyValueStore`] - string key-value operations with TTL and atomic get-and-delete
//! - [`MemoryStore`] - in-process backend for tests and single-node deployments
//!
//! The Redis backend lives in `idp-store-redis`.
//!
//! ## Example
//!
//! ```ignore
//! use idp_store::{IdpStore, MemoryStore};
//! use std::{sync::Arc, time::Duration};
//!
//! let store = IdpStore::new(Arc::new(MemoryStore::new()), Duration::from_secs(2));
//! store.put_artifact("handle", "<samlp:Response/>", Duration::from_secs(60)).await?;
//! let response = store.take_artifact("handle").await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod memory;
pub mod provider;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use provider::KeyValueStore;
pub use store::{IdpStore, ARTIFACT_PREFIX, SESSION_PREFIX};

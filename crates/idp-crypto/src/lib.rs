//! # idp-crypto
//!
//! Cryptographic primitives for the lite-idp identity provider, backed by aws-lc-rs.
//!
//! - [`hash`] - SHA-1 (artifact source IDs only) and SHA-256 digests
//! - [`rsa`] - RSA PKCS#1 v1.5 signing and verification for XML-DSig
//! - [`random`] - Artifact message handles and session tokens

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod hash;
pub mod random;
pub mod rsa;

pub use error::{CryptoError, CryptoResult};
pub use hash::{sha1, sha256, HashAlgorithm};
pub use random::{generate_session_token, random_alphanumeric, random_bytes};
pub use rsa::{rsa_public_key_der, rsa_sign, rsa_verify, RsaAlgorithm};

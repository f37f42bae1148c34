//! Cryptographically secure random generation.
//!
//! Used for:
//! - Artifact message handles
//! - SSO session tokens
//! - Message and assertion identifiers that must not be guessable

use rand::distr::{Alphanumeric, SampleString};
use rand::Rng;

/// Generates a cryptographically secure random byte array.
///
/// Uses the thread-local random number generator which is cryptographically
/// secure by default.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

/// Generates a cryptographically secure random alphanumeric string.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    Alphanumeric.sample_string(&mut rng, len)
}

/// Generates a secure random SSO session token.
///
/// 32 alphanumeric characters, roughly 190 bits of entropy.
#[must_use]
pub fn generate_session_token() -> String {
    random_alphanumeric(32)
}

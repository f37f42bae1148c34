//! Credential backends for the password authenticator.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{AuthError, AuthResult};
use crate::password::PasswordHasherService;

/// Verifies username and password pairs.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Verifies a credential pair and returns the subject identifier.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown user or a wrong
    /// password, without distinguishing the two.
    async fn verify(&self, username: &str, password: &str) -> AuthResult<String>;
}

/// Credentials loaded from a JSON map of username to Argon2id PHC hash.
///
/// ```json
/// { "alice": "$argon2id$v=19$m=19456,t=2,p=1$..." }
/// ```
pub struct JsonCredentialStore {
    users: HashMap<String, String>,
    hasher: Arc<PasswordHasherService>,
    dummy_hash: String,
}

impl JsonCredentialStore {
    /// Builds a store from username to hash pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if the dummy hash for unknown users cannot be computed.
    pub fn from_map(users: HashMap<String, String>, hasher: PasswordHasherService) -> AuthResult<Self> {
        let dummy_hash = hasher.hash(&idp_crypto::random_alphanumeric(24))?;
        Ok(Self {
            users,
            hasher: Arc::new(hasher),
            dummy_hash,
        })
    }

    /// Loads a store from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the file is unreadable or not a
    /// JSON object of strings.
    pub fn from_file(path: impl AsRef<Path>, hasher: PasswordHasherService) -> AuthResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AuthError::Configuration(format!("{}: {e}", path.display())))?;
        let users: HashMap<String, String> = serde_json::from_str(&raw)
            .map_err(|e| AuthError::Configuration(format!("{}: {e}", path.display())))?;
        debug!(users = users.len(), path = %path.display(), "Loaded credentials");
        Self::from_map(users, hasher)
    }

    /// Number of known users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns true if no users are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl CredentialStore for JsonCredentialStore {
    async fn verify(&self, username: &str, password: &str) -> AuthResult<String> {
        let known = self.users.get(username);
        // Unknown users pay for a hash verification too
        let hash = known.unwrap_or(&self.dummy_hash).clone();
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();

        let verified = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        match (known, verified) {
            (Some(_), Ok(())) => Ok(username.to_string()),
            (Some(_), Err(AuthError::Internal(msg))) => {
                warn!(username, error = %msg, "Stored password hash is malformed");
                Err(AuthError::InvalidCredentials)
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

//! Authentication error types.

use std::fmt;

use idp_store::StoreError;

/// Authentication operation errors.
#[derive(Debug)]
pub enum AuthError {
    /// Username or password did not verify.
    InvalidCredentials,
    /// Client certificate could not be decoded or parsed.
    InvalidCertificate(String),
    /// Client certificate was not issued by a trust anchor.
    UntrustedCertificate,
    /// Client certificate is outside its validity window.
    CertificateExpired,
    /// Authenticator chain configuration is invalid.
    InvalidChain(String),
    /// Trust or credential material could not be loaded.
    Configuration(String),
    /// Session store failed.
    Store(StoreError),
    /// Internal error.
    Internal(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::InvalidCertificate(msg) => write!(f, "invalid client certificate: {msg}"),
            Self::UntrustedCertificate => write!(f, "client certificate is not trusted"),
            Self::CertificateExpired => write!(f, "client certificate is not currently valid"),
            Self::InvalidChain(msg) => write!(f, "invalid authenticator chain: {msg}"),
            Self::Configuration(msg) => write!(f, "authentication configuration error: {msg}"),
            Self::Store(err) => write!(f, "session store error: {err}"),
            Self::Internal(msg) => write!(f, "internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

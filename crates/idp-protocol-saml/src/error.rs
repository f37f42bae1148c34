//! SAML error types.
//!
//! Every error maps to a SAML top-level status and to an HTTP status, so a
//! handler can answer either on the relying-party channel or at the HTTP level
//! when no such channel exists yet.

use idp_auth::AuthError;
use idp_store::StoreError;
use thiserror::Error;

use crate::types::{status_codes, sub_status_codes};

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// The request could not be decoded or lacks a required field.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The requested binding has no registered marshaller.
    #[error("unsupported binding: {0}")]
    UnsupportedBinding(String),

    /// No authenticator accepted the caller.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The signer rejected the document or timed out.
    #[error("signing failed: {0}")]
    SigningError(String),

    /// A signature did not verify.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// The artifact or session store could not serve the request.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The artifact handle does not resolve.
    ///
    /// Expired, consumed and forged handles are indistinguishable.
    #[error("artifact not found")]
    ArtifactNotFound,

    /// The caller is not allowed to use this endpoint.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Invalid configuration or key material.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SamlError {
    /// Returns the SAML top-level status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_)
            | Self::UnsupportedBinding(_)
            | Self::SignatureInvalid(_)
            | Self::ArtifactNotFound
            | Self::Forbidden(_) => status_codes::REQUESTER,
            _ => status_codes::RESPONDER,
        }
    }

    /// Returns a second-level status code if one applies.
    #[must_use]
    pub const fn sub_status_code(&self) -> Option<&'static str> {
        match self {
            Self::AuthenticationFailed(_) => Some(sub_status_codes::AUTHN_FAILED),
            Self::UnsupportedBinding(_) => Some(sub_status_codes::REQUEST_UNSUPPORTED),
            Self::Forbidden(_) => Some(sub_status_codes::REQUEST_DENIED),
            _ => None,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::MalformedRequest(_) | Self::UnsupportedBinding(_) => 400,
            Self::AuthenticationFailed(_) | Self::SignatureInvalid(_) => 401,
            Self::Forbidden(_) => 403,
            Self::ArtifactNotFound => 404,
            Self::StoreUnavailable(_) => 503,
            _ => 500,
        }
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::MalformedRequest(format!("XML: {err}"))
    }
}

impl From<quick_xml::events::attributes::AttrError> for SamlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::MalformedRequest(format!("XML attribute: {err}"))
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::MalformedRequest(format!("base64: {err}"))
    }
}

impl From<std::io::Error> for SamlError {
    fn from(err: std::io::Error) -> Self {
        Self::MalformedRequest(format!("inflate: {err}"))
    }
}

impl From<StoreError> for SamlError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::ArtifactNotFound,
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<AuthError> for SamlError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(e) => e.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

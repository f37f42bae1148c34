//! SAML Status types.
//!
//! Status information returned in SAML protocol responses.

use serde::{Deserialize, Serialize};

use super::{status_codes, sub_status_codes};
use crate::error::SamlError;

/// SAML protocol status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Top-level status code URI.
    pub code: String,

    /// Optional second-level status code URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_code: Option<String>,

    /// Optional status message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Status {
    fn new(code: &str, sub_code: Option<&str>, message: Option<String>) -> Self {
        Self {
            code: code.to_string(),
            sub_code: sub_code.map(String::from),
            message,
        }
    }

    /// Creates a success status.
    #[must_use]
    pub fn success() -> Self {
        Self::new(status_codes::SUCCESS, None, None)
    }

    /// Creates a bare requester status.
    ///
    /// Used for artifact misses, which carry no further detail.
    #[must_use]
    pub fn requester() -> Self {
        Self::new(status_codes::REQUESTER, None, None)
    }

    /// Creates an authentication failed status.
    #[must_use]
    pub fn authn_failed(message: impl Into<String>) -> Self {
        Self::new(
            status_codes::RESPONDER,
            Some(sub_status_codes::AUTHN_FAILED),
            Some(message.into()),
        )
    }

    /// Creates a status for a passive request that needed interaction.
    #[must_use]
    pub fn no_passive() -> Self {
        Self::new(
            status_codes::RESPONDER,
            Some(sub_status_codes::NO_PASSIVE),
            None,
        )
    }

    /// Creates a status describing `error`.
    #[must_use]
    pub fn from_error(error: &SamlError) -> Self {
        Self::new(
            error.status_code(),
            error.sub_status_code(),
            Some(error.to_string()),
        )
    }

    /// Returns true if this status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == status_codes::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_has_no_detail() {
        let status = Status::success();
        assert!(status.is_success());
        assert!(status.sub_code.is_none());
        assert!(status.message.is_none());
    }

    #[test]
    fn authn_failed_is_responder_with_sub_code() {
        let status = Status::authn_failed("no authenticator accepted the request");
        assert!(!status.is_success());
        assert_eq!(status.code, status_codes::RESPONDER);
        assert_eq!(status.sub_code.as_deref(), Some(sub_status_codes::AUTHN_FAILED));
    }

    #[test]
    fn from_error_uses_error_codes() {
        let status = Status::from_error(&SamlError::UnsupportedBinding("x".to_string()));
        assert_eq!(status.code, status_codes::REQUESTER);
        assert_eq!(
            status.sub_code.as_deref(),
            Some(sub_status_codes::REQUEST_UNSUPPORTED)
        );
    }
}

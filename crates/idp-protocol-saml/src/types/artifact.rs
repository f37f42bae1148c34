//! Artifact resolution protocol messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Status, SAML_VERSION};

/// SAML ArtifactResolve request, sent by a service provider over SOAP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactResolve {
    /// Unique identifier for this request.
    pub id: String,

    /// Version of the SAML protocol.
    pub version: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The requesting service provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// The artifact handle to resolve.
    pub artifact: String,
}

impl ArtifactResolve {
    /// Creates a resolve request for `artifact`.
    #[must_use]
    pub fn new(issuer: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            id: super::generate_id(),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now(),
            issuer: Some(issuer.into()),
            artifact: artifact.into(),
        }
    }
}

/// SAML ArtifactResponse.
///
/// On a hit `message` holds the stored, already signed response XML, which is
/// embedded verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactResponse {
    /// Unique identifier for this response.
    pub id: String,

    /// Version of the SAML protocol.
    pub version: String,

    /// Timestamp when this response was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of this IdP.
    pub issuer: String,

    /// ID of the ArtifactResolve being answered.
    pub in_response_to: String,

    /// Resolution status.
    pub status: Status,

    /// Embedded protocol message XML.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ArtifactResponse {
    /// Answers `resolve` with the stored message.
    #[must_use]
    pub fn found(issuer: impl Into<String>, resolve: &ArtifactResolve, message: String) -> Self {
        Self {
            status: Status::success(),
            message: Some(message),
            ..Self::not_found(issuer, resolve)
        }
    }

    /// Answers `resolve` with the uniform miss status.
    #[must_use]
    pub fn not_found(issuer: impl Into<String>, resolve: &ArtifactResolve) -> Self {
        Self {
            id: super::generate_id(),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            in_response_to: resolve.id.clone(),
            status: Status::requester(),
            message: None,
        }
    }
}

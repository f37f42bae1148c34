//! SAML AuthnRequest types.
//!
//! Authentication request message sent by a service provider to an identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{NameIdFormat, SamlBinding, SAML_VERSION};

/// SAML Authentication Request.
///
/// Immutable once parsed. `id` is echoed as `InResponseTo` in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthnRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    pub version: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the service provider issuing the request.
    pub issuer: String,

    /// The URL where the response should be sent.
    pub assertion_consumer_service_url: String,

    /// Binding to use for the response.
    pub protocol_binding: SamlBinding,

    /// The URL the request was sent to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Name ID policy constraints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id_policy: Option<NameIdPolicy>,

    /// Whether the IdP must authenticate the user directly.
    #[serde(default)]
    pub force_authn: bool,

    /// Whether the IdP must not interact with the user.
    #[serde(default)]
    pub is_passive: bool,

    /// The RelayState that accompanied the request. Not part of the XML.
    #[serde(skip)]
    pub relay_state: Option<String>,
}

impl AuthnRequest {
    /// Creates a request with a fresh ID and the HTTP-POST response binding.
    #[must_use]
    pub fn new(issuer: impl Into<String>, acs_url: impl Into<String>) -> Self {
        Self {
            id: super::generate_id(),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            assertion_consumer_service_url: acs_url.into(),
            protocol_binding: SamlBinding::HttpPost,
            destination: None,
            name_id_policy: None,
            force_authn: false,
            is_passive: false,
            relay_state: None,
        }
    }

    /// Sets the request ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the response binding.
    #[must_use]
    pub const fn with_binding(mut self, binding: SamlBinding) -> Self {
        self.protocol_binding = binding;
        self
    }

    /// Sets the destination.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Sets the name ID policy.
    #[must_use]
    pub fn with_name_id_policy(mut self, policy: NameIdPolicy) -> Self {
        self.name_id_policy = Some(policy);
        self
    }

    /// Sets `ForceAuthn`.
    #[must_use]
    pub const fn with_force_authn(mut self, force: bool) -> Self {
        self.force_authn = force;
        self
    }

    /// Sets `IsPassive`.
    #[must_use]
    pub const fn with_is_passive(mut self, passive: bool) -> Self {
        self.is_passive = passive;
        self
    }

    /// Sets the RelayState.
    #[must_use]
    pub fn with_relay_state(mut self, relay_state: impl Into<String>) -> Self {
        self.relay_state = Some(relay_state.into());
        self
    }

    /// Returns the requested name ID format, if any.
    #[must_use]
    pub fn requested_name_id_format(&self) -> Option<&str> {
        self.name_id_policy.as_ref()?.format.as_deref()
    }
}

/// Name ID policy from an AuthnRequest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameIdPolicy {
    /// Requested format URI, kept verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Whether the IdP may create a new identifier.
    #[serde(default)]
    pub allow_create: bool,
}

impl NameIdPolicy {
    /// Creates a policy requesting `format`.
    #[must_use]
    pub fn new(format: NameIdFormat) -> Self {
        Self {
            format: Some(format.uri().to_string()),
            allow_create: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_post_binding() {
        let request = AuthnRequest::new("https://sp.example.com", "https://sp.example.com/acs");
        assert_eq!(request.protocol_binding, SamlBinding::HttpPost);
        assert_eq!(request.version, "2.0");
        assert!(request.id.starts_with('_'));
        assert!(request.requested_name_id_format().is_none());
    }

    #[test]
    fn name_id_policy_keeps_format_uri() {
        let request = AuthnRequest::new("sp", "https://sp/acs")
            .with_name_id_policy(NameIdPolicy::new(NameIdFormat::Email));
        assert_eq!(
            request.requested_name_id_format(),
            Some(NameIdFormat::Email.uri())
        );
    }
}

//! SAML Assertion types.
//!
//! Assertions carry statements about a subject made by this IdP.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{AuthnContextClass, NameId, SAML_VERSION};
use crate::attributes::AttributeSet;

/// SAML Assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assertion {
    /// Unique identifier for this assertion.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    pub version: String,

    /// Timestamp when this assertion was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of this IdP.
    pub issuer: String,

    /// The subject of this assertion.
    pub subject: Subject,

    /// Validity window and audience.
    pub conditions: Conditions,

    /// How the subject authenticated. Absent for attribute query answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_statement: Option<AuthnStatement>,

    /// Attributes about the subject. Empty sets are not serialized.
    #[serde(default)]
    pub attributes: AttributeSet,
}

impl Assertion {
    /// Creates an assertion issued now.
    #[must_use]
    pub fn new(issuer: impl Into<String>, subject: Subject, conditions: Conditions) -> Self {
        Self {
            id: super::generate_id(),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            subject,
            conditions,
            authn_statement: None,
            attributes: AttributeSet::default(),
        }
    }

    /// Sets the issue instant.
    #[must_use]
    pub const fn with_issue_instant(mut self, instant: DateTime<Utc>) -> Self {
        self.issue_instant = instant;
        self
    }

    /// Sets the authentication statement.
    #[must_use]
    pub fn with_authn_statement(mut self, statement: AuthnStatement) -> Self {
        self.authn_statement = Some(statement);
        self
    }

    /// Sets the attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: AttributeSet) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Subject of an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// The subject's name identifier.
    pub name_id: NameId,

    /// Bearer confirmation for browser SSO.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<SubjectConfirmationData>,
}

impl Subject {
    /// Creates a subject without confirmation.
    #[must_use]
    pub const fn new(name_id: NameId) -> Self {
        Self {
            name_id,
            confirmation: None,
        }
    }

    /// Adds bearer confirmation data.
    #[must_use]
    pub fn with_confirmation(mut self, data: SubjectConfirmationData) -> Self {
        self.confirmation = Some(data);
        self
    }
}

/// Bearer subject confirmation data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfirmationData {
    /// ID of the request being answered.
    pub in_response_to: String,

    /// ACS URL the assertion is delivered to.
    pub recipient: String,

    /// Time after which the assertion must not be presented.
    pub not_on_or_after: DateTime<Utc>,
}

/// Assertion validity window and audience restriction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    /// Start of the validity window.
    pub not_before: DateTime<Utc>,

    /// End of the validity window, exclusive.
    pub not_on_or_after: DateTime<Utc>,

    /// Intended audience, the requesting service provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

impl Conditions {
    /// Builds a window opening `skew` before `now` and closing `validity` after it.
    #[must_use]
    pub fn window(now: DateTime<Utc>, skew: Duration, validity: Duration) -> Self {
        Self {
            not_before: now - skew,
            not_on_or_after: now + validity,
            audience: None,
        }
    }

    /// Restricts the assertion to an audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Returns true if `now` falls inside the window.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now < self.not_on_or_after
    }
}

/// Authentication statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthnStatement {
    /// When the principal authenticated.
    pub authn_instant: DateTime<Utc>,

    /// Session index handed to the service provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_index: Option<String>,

    /// How the principal authenticated.
    #[serde(with = "context_class_uri")]
    pub context_class: AuthnContextClass,
}

mod context_class_uri {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::types::AuthnContextClass;

    pub fn serialize<S: Serializer>(class: &AuthnContextClass, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(class.uri())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<AuthnContextClass, D::Error> {
        let uri = String::deserialize(d)?;
        Ok(AuthnContextClass::from_uri(&uri).unwrap_or_default())
    }
}

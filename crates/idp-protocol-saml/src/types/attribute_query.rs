//! Attribute query protocol messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{NameId, SAML_VERSION};

/// SAML AttributeQuery, sent by a service provider over SOAP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeQuery {
    /// Unique identifier for this query.
    pub id: String,

    /// Version of the SAML protocol.
    pub version: String,

    /// Timestamp when this query was issued.
    pub issue_instant: DateTime<Utc>,

    /// The requesting service provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Subject whose attributes are requested.
    pub subject: NameId,

    /// Names of the requested attributes. Empty means all.
    #[serde(default)]
    pub requested: Vec<String>,
}

impl AttributeQuery {
    /// Creates a query for every attribute of `subject`.
    #[must_use]
    pub fn new(issuer: impl Into<String>, subject: NameId) -> Self {
        Self {
            id: super::generate_id(),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now(),
            issuer: Some(issuer.into()),
            subject,
            requested: Vec::new(),
        }
    }

    /// Restricts the query to the named attribute.
    #[must_use]
    pub fn requesting(mut self, name: impl Into<String>) -> Self {
        self.requested.push(name.into());
        self
    }
}

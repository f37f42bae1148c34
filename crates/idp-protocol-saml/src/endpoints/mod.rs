//! SAML endpoint handlers.
//!
//! - **SSO** - [`process_sso`] decides what an AuthnRequest is answered with
//! - **Artifact resolution** - SOAP back channel, each handle resolves once
//! - **Attribute query** - SOAP back channel for certificate-authenticated SPs
//!
//! # Example
//!
//! ```rust,ignore
//! use idp_protocol_saml::endpoints::{soap_router, IdpState};
//! use axum::Router;
//!
//! let app = Router::new()
//!     .merge(soap_router("/saml/artifact", "/saml/attributes"))
//!     .with_state(state);
//! ```

mod artifact;
mod query;
mod router;
mod sso;
mod state;

pub use artifact::*;
pub use query::*;
pub use router::*;
pub use sso::*;
pub use state::*;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::bindings::SOAP_CONTENT_TYPE;
use crate::error::SamlError;

pub(crate) fn soap_response(envelope: String) -> Response {
    ([(header::CONTENT_TYPE, SOAP_CONTENT_TYPE)], envelope).into_response()
}

impl SamlError {
    /// Logs the error at a level matching its HTTP status and converts it.
    #[must_use]
    pub fn into_response_logged(self, context: &str) -> Response {
        if self.http_status() >= 500 {
            error!(error = %self, context, "SAML request failed");
        } else {
            warn!(error = %self, context, "SAML request rejected");
        }
        self.into_response()
    }
}

impl IntoResponse for SamlError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = if status.is_server_error() {
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        } else {
            self.to_string()
        };
        (status, body).into_response()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use idp_auth::{
        AuthenticatorChain, AuthenticatorLink, JsonCredentialStore, PasswordAuthenticator,
        PasswordHasherService, PasswordPolicy, PkiAuthenticator, TrustAnchors,
    };
    use idp_store::{IdpStore, MemoryStore};

    use super::IdpState;
    use crate::attributes::{AttributeSet, JsonAttributeRetriever};
    use crate::signature::{SigningService, XmlSigner};

    pub const ENTITY_ID: &str = "https://idp.example.com";
    pub const IDP_KEY: &str = include_str!("../../../../tests/fixtures/idp.key");
    pub const IDP_CERT: &str = include_str!("../../../../tests/fixtures/idp.crt");
    pub const CA: &str = include_str!("../../../../tests/fixtures/ca.crt");
    pub const ALICE_CERT: &str = include_str!("../../../../tests/fixtures/alice.crt");
    pub const MALLORY_CERT: &str = include_str!("../../../../tests/fixtures/mallory.crt");

    fn anchors() -> Arc<TrustAnchors> {
        Arc::new(TrustAnchors::from_pem(CA.as_bytes()).unwrap())
    }

    fn builder(store: &IdpStore) -> super::IdpStateBuilder {
        let signer = XmlSigner::from_pem(IDP_KEY.as_bytes(), IDP_CERT.as_bytes()).unwrap();
        let retriever = JsonAttributeRetriever::from_map(HashMap::from([
            (
                "alice".to_string(),
                AttributeSet::new()
                    .with("mail", &["alice@example.com"])
                    .with("role", &["admin", "user"]),
            ),
            (
                "carol".to_string(),
                AttributeSet::new().with("mail", &["carol@example.com"]),
            ),
        ]));

        IdpState::builder(
            ENTITY_ID,
            SigningService::new(Arc::new(signer), Duration::from_secs(5)),
            store.clone(),
        )
        .retriever(Arc::new(retriever))
        .trust_anchors(anchors())
    }

    fn store() -> IdpStore {
        IdpStore::new(Arc::new(MemoryStore::new()), Duration::from_secs(1))
    }

    /// Certificate first, then password login for carol/secret.
    pub fn state() -> IdpState {
        let store = store();
        let hasher = PasswordHasherService::new(PasswordPolicy::new().memory_cost(1024).time_cost(1));
        let hash = hasher.hash("secret").unwrap();
        let credentials =
            JsonCredentialStore::from_map(HashMap::from([("carol".to_string(), hash)]), hasher)
                .unwrap();

        let chain = AuthenticatorChain::new(vec![
            AuthenticatorLink::Pki(PkiAuthenticator::new(anchors())),
            AuthenticatorLink::Password(PasswordAuthenticator::new(
                Arc::new(credentials),
                store.clone(),
                Duration::from_secs(3600),
            )),
        ])
        .unwrap();

        builder(&store).chain(chain).build().unwrap()
    }

    /// Certificate authentication only; nothing to challenge with.
    pub fn pki_only_state() -> IdpState {
        let store = store();
        let chain =
            AuthenticatorChain::new(vec![AuthenticatorLink::Pki(PkiAuthenticator::new(anchors()))])
                .unwrap();
        builder(&store).chain(chain).build().unwrap()
    }
}

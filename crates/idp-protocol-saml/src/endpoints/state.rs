//! Shared endpoint state.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap};
use idp_auth::{AuthenticatorChain, TrustAnchors};
use idp_store::IdpStore;

use crate::attributes::{AttributeRetriever, JsonAttributeRetriever};
use crate::error::{SamlError, SamlResult};
use crate::generator::{ResponseGenerator, DEFAULT_ASSERTION_VALIDITY, DEFAULT_CLOCK_SKEW};
use crate::marshaller::{
    ArtifactMarshaller, MarshallerRegistry, PostMarshaller, ResponseMarshaller, DEFAULT_ARTIFACT_TTL,
};
use crate::parser::RequestParser;
use crate::signature::SigningService;
use tracing::warn;

/// Default header carrying a forwarded client certificate.
pub const DEFAULT_CLIENT_CERT_HEADER: &str = "x-client-cert";

/// State shared by every SAML endpoint.
///
/// Read-only after startup apart from the store client, which is safe for
/// concurrent use.
#[derive(Clone)]
pub struct IdpState {
    /// Issuing entity ID.
    pub entity_id: Arc<str>,
    /// AuthnRequest parser.
    pub parser: Arc<RequestParser>,
    /// Authenticator chain.
    pub chain: Arc<AuthenticatorChain>,
    /// Response generator.
    pub generator: ResponseGenerator,
    /// Marshallers by binding.
    pub marshallers: Arc<MarshallerRegistry>,
    /// Signer.
    pub signer: SigningService,
    /// Artifact and session store.
    pub store: IdpStore,
    /// Issuers trusted for client certificates. Attribute queries are refused without them.
    pub trust_anchors: Option<Arc<TrustAnchors>>,
    /// Header carrying a forwarded client certificate, lowercase.
    pub client_cert_header: Arc<str>,
    /// Peers allowed to set `client_cert_header`. Empty means any peer.
    pub trusted_proxies: Arc<[IpAddr]>,
}

impl IdpState {
    /// Starts building state for `entity_id`.
    #[must_use]
    pub fn builder(
        entity_id: impl Into<String>,
        signer: SigningService,
        store: IdpStore,
    ) -> IdpStateBuilder {
        IdpStateBuilder::new(entity_id, signer, store)
    }

    /// Returns the forwarded client certificate if the connected peer may
    /// forward one.
    ///
    /// The header carries no proof of possession. With no trusted proxies
    /// configured it is honored from any peer, so the TLS-terminating front
    /// end must strip it from client traffic and set it itself. With a list
    /// configured the peer address comes from [`ConnectInfo`]; a request
    /// without one is treated as untrusted.
    #[must_use]
    pub fn forwarded_certificate<'a>(
        &self,
        headers: &'a HeaderMap,
        extensions: &Extensions,
    ) -> Option<&'a str> {
        let certificate = headers
            .get(&*self.client_cert_header)
            .and_then(|value| value.to_str().ok())?;
        if self.trusted_proxies.is_empty() {
            return Some(certificate);
        }

        let peer = extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        match peer {
            Some(ip) if self.trusted_proxies.contains(&ip) => Some(certificate),
            _ => {
                warn!(
                    peer = ?peer,
                    header = %self.client_cert_header,
                    "Ignoring client certificate header from untrusted peer"
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for IdpState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdpState")
            .field("entity_id", &self.entity_id)
            .field("chain", &self.chain)
            .field("marshallers", &self.marshallers)
            .finish_non_exhaustive()
    }
}

/// Builder for [`IdpState`].
#[must_use]
pub struct IdpStateBuilder {
    entity_id: String,
    signer: SigningService,
    store: IdpStore,
    chain: Option<AuthenticatorChain>,
    retriever: Option<Arc<dyn AttributeRetriever>>,
    trust_anchors: Option<Arc<TrustAnchors>>,
    client_cert_header: String,
    trusted_proxies: Vec<IpAddr>,
    artifact_ttl: Duration,
    assertion_validity: Duration,
    clock_skew: Duration,
    deadline: Duration,
}

impl IdpStateBuilder {
    /// Creates a builder with default lifetimes.
    pub fn new(entity_id: impl Into<String>, signer: SigningService, store: IdpStore) -> Self {
        let deadline = store.deadline();
        Self {
            entity_id: entity_id.into(),
            signer,
            store,
            chain: None,
            retriever: None,
            trust_anchors: None,
            client_cert_header: DEFAULT_CLIENT_CERT_HEADER.to_string(),
            trusted_proxies: Vec::new(),
            artifact_ttl: DEFAULT_ARTIFACT_TTL,
            assertion_validity: DEFAULT_ASSERTION_VALIDITY,
            clock_skew: DEFAULT_CLOCK_SKEW,
            deadline,
        }
    }

    /// Sets the authenticator chain.
    pub fn chain(mut self, chain: AuthenticatorChain) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Sets the attribute retriever. Defaults to one that knows no subjects.
    pub fn retriever(mut self, retriever: Arc<dyn AttributeRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Sets the client certificate trust anchors.
    pub fn trust_anchors(mut self, anchors: Arc<TrustAnchors>) -> Self {
        self.trust_anchors = Some(anchors);
        self
    }

    /// Sets the client certificate header name.
    pub fn client_cert_header(mut self, name: impl Into<String>) -> Self {
        self.client_cert_header = name.into();
        self
    }

    /// Restricts the client certificate header to these peers.
    pub fn trusted_proxies(mut self, proxies: impl IntoIterator<Item = IpAddr>) -> Self {
        self.trusted_proxies = proxies.into_iter().collect();
        self
    }

    /// Sets the artifact lifetime.
    pub const fn artifact_ttl(mut self, ttl: Duration) -> Self {
        self.artifact_ttl = ttl;
        self
    }

    /// Sets the assertion validity.
    pub const fn assertion_validity(mut self, validity: Duration) -> Self {
        self.assertion_validity = validity;
        self
    }

    /// Sets the clock skew allowance.
    pub const fn clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Sets the deadline for attribute lookups.
    pub const fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Builds the state, registering the POST and Artifact marshallers.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::Configuration` if no chain was set.
    pub fn build(self) -> SamlResult<IdpState> {
        let chain = self
            .chain
            .ok_or_else(|| SamlError::Configuration("no authenticator chain".to_string()))?;
        let retriever = self
            .retriever
            .unwrap_or_else(|| Arc::new(JsonAttributeRetriever::default()));

        let marshallers = MarshallerRegistry::new()
            .with(ResponseMarshaller::Post(PostMarshaller))
            .with(ResponseMarshaller::Artifact(ArtifactMarshaller::new(
                self.store.clone(),
                &self.entity_id,
                self.artifact_ttl,
            )));

        let generator = ResponseGenerator::new(&self.entity_id, retriever)
            .with_validity(self.assertion_validity)
            .with_clock_skew(self.clock_skew)
            .with_deadline(self.deadline);

        Ok(IdpState {
            entity_id: Arc::from(self.entity_id.as_str()),
            parser: Arc::new(RequestParser::new(marshallers.bindings())),
            chain: Arc::new(chain),
            generator,
            marshallers: Arc::new(marshallers),
            signer: self.signer,
            store: self.store,
            trust_anchors: self.trust_anchors,
            client_cert_header: Arc::from(self.client_cert_header.to_ascii_lowercase().as_str()),
            trusted_proxies: Arc::from(self.trusted_proxies),
        })
    }
}

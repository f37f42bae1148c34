//! Binding-specific response delivery.
//!
//! Each variant signs the response itself. POST signs the response that goes
//! into the form; Artifact signs the response it stores, never the redirect.

use std::collections::HashMap;
use std::time::Duration;

use idp_store::IdpStore;
use tracing::{debug, info};

use crate::bindings::{handle_prefix, Artifact, HttpArtifactBinding, HttpPostBinding};
use crate::error::{SamlError, SamlResult};
use crate::signature::SigningService;
use crate::types::{AuthnRequest, Response, SamlBinding};
use crate::xml::writer::write_response;

/// Default artifact lifetime.
pub const DEFAULT_ARTIFACT_TTL: Duration = Duration::from_secs(60);

/// What the user agent receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingResponse {
    /// An auto-submitting HTML form.
    PostForm(String),
    /// A redirect to this location.
    Redirect(String),
}

/// HTTP-POST delivery.
#[derive(Debug, Clone, Default)]
pub struct PostMarshaller;

impl PostMarshaller {
    async fn marshal(
        &self,
        response: &Response,
        request: &AuthnRequest,
        signer: &SigningService,
    ) -> SamlResult<BindingResponse> {
        let signed = signer.sign(write_response(response), &response.id).await?;

        debug!(request_id = %request.id, response_id = %response.id, "Marshalled POST response");
        Ok(BindingResponse::PostForm(HttpPostBinding::encode_response(
            &signed,
            &request.assertion_consumer_service_url,
            request.relay_state.as_deref(),
        )))
    }
}

/// HTTP-Artifact delivery.
#[derive(Debug, Clone)]
pub struct ArtifactMarshaller {
    store: IdpStore,
    ttl: Duration,
    entity_id: String,
}

impl ArtifactMarshaller {
    /// Creates a marshaller storing artifacts in `store` for `ttl`.
    #[must_use]
    pub fn new(store: IdpStore, entity_id: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            entity_id: entity_id.into(),
        }
    }

    async fn marshal(
        &self,
        response: &Response,
        request: &AuthnRequest,
        signer: &SigningService,
    ) -> SamlResult<BindingResponse> {
        // The redirect must be buildable before anything is signed or stored
        let handle = Artifact::generate(&self.entity_id).encode();
        let location = HttpArtifactBinding::redirect_url(
            &request.assertion_consumer_service_url,
            &handle,
            request.relay_state.as_deref(),
        )?;

        let signed = signer.sign(write_response(response), &response.id).await?;
        self.store.put_artifact(&handle, &signed, self.ttl).await?;

        info!(
            request_id = %request.id,
            artifact = handle_prefix(&handle),
            ttl_secs = self.ttl.as_secs(),
            "Issued artifact"
        );
        Ok(BindingResponse::Redirect(location))
    }
}

/// A binding-specific marshaller.
#[derive(Debug, Clone)]
pub enum ResponseMarshaller {
    /// HTTP-POST.
    Post(PostMarshaller),
    /// HTTP-Artifact.
    Artifact(ArtifactMarshaller),
}

impl ResponseMarshaller {
    /// Returns the binding this marshaller serves.
    #[must_use]
    pub const fn binding(&self) -> SamlBinding {
        match self {
            Self::Post(_) => SamlBinding::HttpPost,
            Self::Artifact(_) => SamlBinding::HttpArtifact,
        }
    }

    /// Signs `response` and packages it for the user agent.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::SigningError` if signing fails, in which case
    /// nothing is stored or emitted, and `SamlError::StoreUnavailable` if an
    /// artifact cannot be stored.
    pub async fn marshal(
        &self,
        response: &Response,
        request: &AuthnRequest,
        signer: &SigningService,
    ) -> SamlResult<BindingResponse> {
        match self {
            Self::Post(m) => m.marshal(response, request, signer).await,
            Self::Artifact(m) => m.marshal(response, request, signer).await,
        }
    }
}

/// Response bindings mapped to their marshallers.
#[derive(Debug, Clone, Default)]
pub struct MarshallerRegistry {
    marshallers: HashMap<SamlBinding, ResponseMarshaller>,
}

impl MarshallerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a marshaller under its binding.
    #[must_use]
    pub fn with(mut self, marshaller: ResponseMarshaller) -> Self {
        self.marshallers.insert(marshaller.binding(), marshaller);
        self
    }

    /// Returns the marshaller for `binding`.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::UnsupportedBinding` if none is registered.
    pub fn get(&self, binding: SamlBinding) -> SamlResult<&ResponseMarshaller> {
        self.marshallers
            .get(&binding)
            .ok_or_else(|| SamlError::UnsupportedBinding(binding.uri().to_string()))
    }

    /// Returns the registered bindings.
    pub fn bindings(&self) -> impl Iterator<Item = SamlBinding> + '_ {
        self.marshallers.keys().copied()
    }
}

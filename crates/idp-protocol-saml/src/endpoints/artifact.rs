//! Artifact resolution service.
//!
//! The service provider posts an `ArtifactResolve` over SOAP; the stored
//! signed response is taken out of the store and returned inside a signed
//! `ArtifactResponse`. A handle resolves at most once.

use axum::{extract::State, response::Response};
use idp_store::StoreError;
use tracing::{debug, info};

use crate::bindings::{handle_prefix, Artifact, SoapBinding};
use crate::error::SamlResult;
use crate::types::ArtifactResponse;
use crate::xml;

use super::{soap_response, IdpState};

/// POST handler for the artifact resolution endpoint.
pub async fn artifact_resolve(State(state): State<IdpState>, body: String) -> Response {
    match resolve_artifact(&state, &body).await {
        Ok(envelope) => soap_response(envelope),
        Err(e) => e.into_response_logged("artifact resolution"),
    }
}

/// Resolves one ArtifactResolve envelope into a signed answer envelope.
///
/// Expired, consumed, forged and foreign handles all get the same signed
/// `Requester` answer.
///
/// # Errors
///
/// Returns `SamlError::MalformedRequest` for an unreadable envelope,
/// `StoreUnavailable` if the store fails and `SigningError` if the answer
/// cannot be signed.
pub async fn resolve_artifact(state: &IdpState, body: &str) -> SamlResult<String> {
    let resolve = xml::reader::artifact_resolve(&SoapBinding::decode(body)?)?;
    let prefix = handle_prefix(&resolve.artifact);

    let issued_here = Artifact::decode(&resolve.artifact)
        .is_ok_and(|artifact| artifact.is_from(&state.entity_id));

    let taken = if issued_here {
        state.store.take_artifact(&resolve.artifact).await
    } else {
        debug!(artifact = prefix, "Artifact was not issued here");
        Err(StoreError::NotFound)
    };

    let answer = match taken {
        Ok(message) => {
            info!(request_id = %resolve.id, artifact = prefix, "Resolved artifact");
            ArtifactResponse::found(&*state.entity_id, &resolve, message)
        }
        Err(StoreError::NotFound) => {
            info!(request_id = %resolve.id, artifact = prefix, "Artifact did not resolve");
            ArtifactResponse::not_found(&*state.entity_id, &resolve)
        }
        Err(e) => return Err(e.into()),
    };

    let signed = state
        .signer
        .sign(xml::writer::write_artifact_response(&answer), &answer.id)
        .await?;
    Ok(SoapBinding::encode(&signed))
}

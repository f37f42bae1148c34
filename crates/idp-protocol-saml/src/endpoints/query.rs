//! Attribute query service.
//!
//! A service provider authenticated by its client certificate asks for a
//! subject's attributes over SOAP and receives a signed `Response`.

use axum::{
    extract::State,
    http::{Extensions, HeaderMap},
    response::Response,
};
use tracing::{debug, info, warn};

use crate::bindings::SoapBinding;
use crate::error::{SamlError, SamlResult};
use crate::xml;

use super::{soap_response, IdpState};

/// POST handler for the attribute query endpoint.
pub async fn attribute_query(
    State(state): State<IdpState>,
    headers: HeaderMap,
    extensions: Extensions,
    body: String,
) -> Response {
    let certificate = state.forwarded_certificate(&headers, &extensions);

    match answer_attribute_query(&state, certificate, &body).await {
        Ok(envelope) => soap_response(envelope),
        Err(e) => e.into_response_logged("attribute query"),
    }
}

/// Answers one AttributeQuery envelope.
///
/// The requester is checked before the body is read, so an unauthenticated
/// caller causes no store or retriever work.
///
/// # Errors
///
/// Returns `SamlError::Forbidden` if the requester presented no trusted
/// certificate, `MalformedRequest` for an unreadable envelope and
/// `SigningError` if the answer cannot be signed.
pub async fn answer_attribute_query(
    state: &IdpState,
    client_certificate: Option<&str>,
    body: &str,
) -> SamlResult<String> {
    let requester = authorize_requester(state, client_certificate)?;

    let query = xml::reader::attribute_query(&SoapBinding::decode(body)?)?;
    let attributes = state
        .generator
        .fetch_attributes(&query.subject.value)
        .await
        .filter(&query.requested);

    info!(
        request_id = %query.id,
        requester = %requester,
        subject = %query.subject.value,
        attributes = attributes.len(),
        "Answering attribute query"
    );

    let response = state.generator.attribute_response(&query, attributes);
    let signed = state
        .signer
        .sign(xml::writer::write_response(&response), &response.id)
        .await?;
    Ok(SoapBinding::encode(&signed))
}

fn authorize_requester(state: &IdpState, client_certificate: Option<&str>) -> SamlResult<String> {
    let anchors = state
        .trust_anchors
        .as_ref()
        .ok_or_else(|| SamlError::Forbidden("client certificates are not accepted".to_string()))?;
    let header = client_certificate
        .ok_or_else(|| SamlError::Forbidden("client certificate required".to_string()))?;

    match anchors.verify_header(header) {
        Ok(subject) => {
            debug!(requester = %subject, "Attribute query requester verified");
            Ok(subject)
        }
        Err(e) => {
            warn!(error = %e, "Rejected attribute query requester");
            Err(SamlError::Forbidden("client certificate not trusted".to_string()))
        }
    }
}

//! HTTP-Artifact delivery and back-channel resolution.

use axum::http::{header, StatusCode};
use idp_integration_tests::{
    authn_request, body_string, header_value, verify_signed, TestEnv, IDP_CERT, PASSWORD,
    SP_ACS_URL, SP_ENTITY_ID, USERNAME,
};
use idp_protocol_saml::bindings::{HttpArtifactBinding, SoapBinding, SOAP_CONTENT_TYPE};
use idp_protocol_saml::signature::XmlSignatureValidator;
use idp_protocol_saml::types::{status_codes, ArtifactResolve, ArtifactResponse, SamlBinding};
use idp_protocol_saml::xml::{self, ResponseSummary};

fn resolve_message(handle: &str) -> (ArtifactResolve, String) {
    let resolve = ArtifactResolve::new(SP_ENTITY_ID, handle);
    let xml = xml::writer::write_artifact_resolve(&resolve);
    (resolve, xml)
}

async fn resolve(
    env: &TestEnv,
    handle: &str,
) -> anyhow::Result<(ArtifactResolve, String, ArtifactResponse, Option<ResponseSummary>)> {
    let (request, message) = resolve_message(handle);
    let response = env.soap(&env.config.artifact_path, &message, &[]).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(&response, header::CONTENT_TYPE).as_deref(),
        Some(SOAP_CONTENT_TYPE)
    );
    let envelope = body_string(response).await?;
    let signed_id = verify_signed(&envelope)?;

    let (answer, embedded) = xml::reader::artifact_response(&SoapBinding::decode(&envelope)?)?;
    assert_eq!(signed_id, answer.id);
    Ok((request, envelope, answer, embedded))
}

#[tokio::test]
async fn login_redirects_with_artifact_that_resolves_once() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = authn_request(SamlBinding::HttpArtifact).with_relay_state("rs-art");

    // No certificate: the user is challenged first
    let page = env.sso(&request, &[]).await?;
    assert!(body_string(page).await?.contains(r#"name="password""#));

    let response = env.login(&request, USERNAME, PASSWORD).await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(header_value(&response, header::SET_COOKIE).is_some());

    let location = header_value(&response, header::LOCATION)
        .ok_or_else(|| anyhow::anyhow!("no Location"))?;
    assert!(location.starts_with(&format!("{SP_ACS_URL}?SAMLart=")));
    assert!(location.ends_with("&RelayState=rs-art"));
    let handle = HttpArtifactBinding::artifact_from_url(&location)
        .ok_or_else(|| anyhow::anyhow!("no SAMLart"))?;

    let (resolve, envelope, answer, embedded) = resolve(&env, &handle).await?;
    assert_eq!(answer.in_response_to, resolve.id);
    assert_eq!(answer.status.code, status_codes::SUCCESS);

    let embedded = embedded.ok_or_else(|| anyhow::anyhow!("no embedded Response"))?;
    assert_eq!(embedded.in_response_to.as_deref(), Some(request.id.as_str()));
    assert_eq!(embedded.subject.map(|n| n.value).as_deref(), Some(USERNAME));
    XmlSignatureValidator::from_pem(IDP_CERT.as_bytes())?
        .validate_reference(&envelope, &embedded.id)?;

    // Second resolution of the same handle misses
    let (_, _, answer, embedded) = self::resolve(&env, &handle).await?;
    assert_eq!(answer.status.code, status_codes::REQUESTER);
    assert!(embedded.is_none());
    Ok(())
}

#[tokio::test]
async fn unknown_handles_get_uniform_signed_miss() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    for handle in ["AAQAAA", "garbage!!"] {
        let (resolve, _, answer, embedded) = resolve(&env, handle).await?;
        assert_eq!(answer.in_response_to, resolve.id);
        assert_eq!(answer.status.code, status_codes::REQUESTER);
        assert!(answer.status.sub_code.is_none());
        assert!(embedded.is_none());
    }
    Ok(())
}

#[tokio::test]
async fn malformed_resolve_is_bad_request() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let response = env
        .send(
            axum::http::Request::post(env.config.artifact_path.as_str())
                .body(axum::body::Body::from("<soap:Envelope"))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

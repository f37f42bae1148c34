//! SOAP attribute queries from certificate-authenticated service providers.

use axum::http::StatusCode;
use idp_integration_tests::{
    body_string, cert_header, verify_signed, TestEnv, ALICE_CERT, MALLORY_CERT, SP_ENTITY_ID,
};
use idp_protocol_saml::bindings::SoapBinding;
use idp_protocol_saml::types::{status_codes, AttributeQuery, NameId};
use idp_protocol_saml::xml;

fn query_message(query: &AttributeQuery) -> String {
    xml::writer::write_attribute_query(query)
}

#[tokio::test]
async fn trusted_requester_gets_signed_attributes() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let query = AttributeQuery::new(SP_ENTITY_ID, NameId::new("alice")).requesting("role");
    let cert = cert_header(ALICE_CERT);

    let response = env
        .soap(&env.config.attribute_query_path, &query_message(&query), &[("X-Client-Cert", cert.as_str())])
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let envelope = body_string(response).await?;
    verify_signed(&envelope)?;
    let summary = xml::reader::response_summary(&SoapBinding::decode(&envelope)?)?;

    assert_eq!(summary.in_response_to.as_deref(), Some(query.id.as_str()));
    assert_eq!(summary.status.code, status_codes::SUCCESS);
    assert_eq!(summary.audience.as_deref(), Some(SP_ENTITY_ID));
    assert_eq!(
        summary.attributes,
        vec![("role".to_string(), vec!["admin".to_string(), "user".to_string()])]
    );
    Ok(())
}

#[tokio::test]
async fn requester_without_trusted_certificate_is_forbidden() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let message = query_message(&AttributeQuery::new(SP_ENTITY_ID, NameId::new("alice")));
    let untrusted = cert_header(MALLORY_CERT);

    let anonymous = env.soap(&env.config.attribute_query_path, &message, &[]).await?;
    assert_eq!(anonymous.status(), StatusCode::FORBIDDEN);

    let rejected = env
        .soap(&env.config.attribute_query_path, &message, &[("X-Client-Cert", untrusted.as_str())])
        .await?;
    assert_eq!(rejected.status(), StatusCode::FORBIDDEN);
    assert!(!body_string(rejected).await?.contains("alice@example.com"));
    Ok(())
}

//! Redirect-binding SSO through the full router.

use axum::http::{header, StatusCode};
use idp_auth::INVALID_CREDENTIALS_MESSAGE;
use idp_integration_tests::{
    authn_request, body_string, cert_header, header_value, posted_response, TestEnv, ALICE_CERT,
    BOB_EXPIRED_CERT, PASSWORD, SP_ACS_URL, SP_ENTITY_ID, USERNAME,
};
use idp_protocol_saml::types::{status_codes, sub_status_codes, SamlBinding};

#[tokio::test]
async fn certificate_login_posts_signed_response() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = authn_request(SamlBinding::HttpPost).with_relay_state("rs-42");
    let cert = cert_header(ALICE_CERT);

    let response = env.sso(&request, &[("X-Client-Cert", cert.as_str())]).await?;
    let (summary, relay_state) = posted_response(response).await?;

    assert_eq!(summary.in_response_to.as_deref(), Some(request.id.as_str()));
    assert_eq!(summary.destination.as_deref(), Some(SP_ACS_URL));
    assert_eq!(summary.status.code, status_codes::SUCCESS);
    assert_eq!(summary.subject.map(|n| n.value).as_deref(), Some("alice"));
    assert_eq!(summary.audience.as_deref(), Some(SP_ENTITY_ID));
    assert!(summary
        .attributes
        .iter()
        .any(|(name, values)| name == "mail" && values == &["alice@example.com".to_string()]));
    assert_eq!(relay_state.as_deref(), Some("rs-42"));
    Ok(())
}

#[tokio::test]
async fn untrusted_certificate_falls_through_to_login() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let cert = cert_header(BOB_EXPIRED_CERT);

    let response = env
        .sso(&authn_request(SamlBinding::HttpPost), &[("X-Client-Cert", cert.as_str())])
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await?;
    assert!(html.contains(r#"name="password""#));
    assert!(!html.contains("SAMLResponse"));
    Ok(())
}

#[tokio::test]
async fn login_page_then_post_response_with_session() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = authn_request(SamlBinding::HttpPost).with_relay_state("after-login");

    let page = env.sso(&request, &[]).await?;
    assert_eq!(page.status(), StatusCode::OK);
    let html = body_string(page).await?;
    assert!(html.contains(r#"name="SAMLRequest""#));
    assert!(html.contains(r#"name="RelayState" value="after-login""#));

    let response = env.login(&request, USERNAME, PASSWORD).await?;
    let cookie = header_value(&response, header::SET_COOKIE)
        .ok_or_else(|| anyhow::anyhow!("no session cookie"))?;
    assert!(cookie.starts_with(&format!("{}=", env.config.session_cookie)));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Max-Age=28800"));

    let (summary, relay_state) = posted_response(response).await?;
    assert_eq!(summary.subject.map(|n| n.value).as_deref(), Some(USERNAME));
    assert_eq!(relay_state.as_deref(), Some("after-login"));

    // The cookie alone is enough for the next request
    let token = cookie
        .split(';')
        .next()
        .unwrap_or_default()
        .to_string();
    let next = authn_request(SamlBinding::HttpPost);
    let response = env.sso(&next, &[("Cookie", token.as_str())]).await?;
    let (summary, _) = posted_response(response).await?;
    assert_eq!(summary.in_response_to.as_deref(), Some(next.id.as_str()));
    assert_eq!(summary.subject.map(|n| n.value).as_deref(), Some(USERNAME));

    // ForceAuthn ignores it
    let forced = authn_request(SamlBinding::HttpPost).with_force_authn(true);
    let response = env.sso(&forced, &[("Cookie", token.as_str())]).await?;
    assert!(body_string(response).await?.contains(r#"name="password""#));
    Ok(())
}

#[tokio::test]
async fn wrong_password_shows_login_again() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let response = env
        .login(&authn_request(SamlBinding::HttpPost), USERNAME, "wrong")
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_value(&response, header::SET_COOKIE).is_none());
    let html = body_string(response).await?;
    assert!(html.contains(INVALID_CREDENTIALS_MESSAGE));
    assert!(html.contains(r#"name="SAMLRequest""#));
    Ok(())
}

#[tokio::test]
async fn passive_request_without_session_gets_no_passive() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = authn_request(SamlBinding::HttpPost).with_is_passive(true);

    let (summary, _) = posted_response(env.sso(&request, &[]).await?).await?;

    assert_eq!(summary.in_response_to.as_deref(), Some(request.id.as_str()));
    assert_eq!(summary.status.code, status_codes::RESPONDER);
    assert_eq!(summary.status.sub_code.as_deref(), Some(sub_status_codes::NO_PASSIVE));
    assert!(summary.subject.is_none());
    Ok(())
}

#[tokio::test]
async fn malformed_requests_are_rejected_at_http_level() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let sso = &env.config.sso_path;

    for uri in [
        sso.clone(),
        format!("{sso}?SAMLRequest="),
        format!("{sso}?SAMLRequest=not-base64!!"),
        format!("{sso}?SAMLRequest=aGVsbG8%3D"),
    ] {
        let response = env
            .send(axum::http::Request::get(uri.as_str()).body(axum::body::Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
    Ok(())
}

#[tokio::test]
async fn unsupported_binding_is_rejected_before_authentication() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let cert = cert_header(ALICE_CERT);

    let response = env
        .sso(&authn_request(SamlBinding::HttpRedirect), &[("X-Client-Cert", cert.as_str())])
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_string(response).await?;
    assert!(html.contains("unsupported binding"));
    assert!(env.store.ping().await.is_ok());
    Ok(())
}

#[tokio::test]
async fn relative_acs_url_is_rejected_before_login_or_artifact() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = idp_protocol_saml::types::AuthnRequest::new(SP_ENTITY_ID, "/acs")
        .with_binding(SamlBinding::HttpArtifact);

    let response = env.login(&request, USERNAME, PASSWORD).await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(header_value(&response, header::SET_COOKIE).is_none());
    assert!(header_value(&response, header::LOCATION).is_none());
    assert!(env.backend.is_empty());
    Ok(())
}

#[tokio::test]
async fn health_endpoints_report_ready() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    for path in ["/health", "/health/live", "/health/ready"] {
        let response = env
            .send(axum::http::Request::get(path).body(axum::body::Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
    Ok(())
}

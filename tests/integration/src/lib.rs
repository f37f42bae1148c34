//! Test harness for the end-to-end scenarios.
//!
//! [`TestEnv`] assembles the full server router over an in-memory store with
//! the fixture key material, a certificate-then-password authenticator chain
//! and a small attribute store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use idp_auth::{
    AuthenticatorChain, AuthenticatorLink, JsonCredentialStore, PasswordAuthenticator,
    PasswordHasherService, PasswordPolicy, PkiAuthenticator, TrustAnchors,
};
use idp_protocol_saml::attributes::{AttributeSet, JsonAttributeRetriever};
use idp_protocol_saml::bindings::{HttpPostBinding, HttpRedirectBinding, SoapBinding};
use idp_protocol_saml::signature::{SigningService, XmlSignatureValidator, XmlSigner};
use idp_protocol_saml::types::{AuthnRequest, SamlBinding};
use idp_protocol_saml::xml::{self, ResponseSummary};
use idp_server::{providers, Server, ServerConfig};
use idp_store::{IdpStore, MemoryStore};

/// IdP signing key.
pub const IDP_KEY: &str = include_str!("../../fixtures/idp.key");
/// IdP signing certificate.
pub const IDP_CERT: &str = include_str!("../../fixtures/idp.crt");
/// Client certificate issuer.
pub const CA_CERT: &str = include_str!("../../fixtures/ca.crt");
/// Client certificate for `alice`, issued by the CA.
pub const ALICE_CERT: &str = include_str!("../../fixtures/alice.crt");
/// Self-signed client certificate.
pub const MALLORY_CERT: &str = include_str!("../../fixtures/mallory.crt");
/// Expired client certificate issued by the CA.
pub const BOB_EXPIRED_CERT: &str = include_str!("../../fixtures/bob-expired.crt");

/// Service provider entity ID used by the scenarios.
pub const SP_ENTITY_ID: &str = "https://sp.example.com";
/// Service provider assertion consumer service.
pub const SP_ACS_URL: &str = "https://sp.example.com/acs";
/// Password user.
pub const USERNAME: &str = "carol";
/// Password of [`USERNAME`].
pub const PASSWORD: &str = "secret";

/// An assembled server and its store.
pub struct TestEnv {
    /// The full application router.
    pub router: Router,
    /// Configuration the router was built with.
    pub config: ServerConfig,
    /// The store behind the router.
    pub store: IdpStore,
    /// The in-memory backend of [`TestEnv::store`].
    pub backend: Arc<MemoryStore>,
}

impl TestEnv {
    /// Builds the environment.
    pub fn new() -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("idp_server=debug,idp_protocol_saml=debug")
            .with_test_writer()
            .try_init();

        let config = ServerConfig::for_testing();
        let backend = Arc::new(MemoryStore::new());
        let store = IdpStore::new(backend.clone(), config.request_timeout());
        let anchors = Arc::new(TrustAnchors::from_pem(CA_CERT.as_bytes())?);

        let hasher = PasswordHasherService::new(PasswordPolicy::new().memory_cost(1024).time_cost(1));
        let hash = hasher.hash(PASSWORD)?;
        let credentials =
            JsonCredentialStore::from_map(HashMap::from([(USERNAME.to_string(), hash)]), hasher)?;

        let chain = AuthenticatorChain::new(vec![
            AuthenticatorLink::Pki(PkiAuthenticator::new(anchors.clone())),
            AuthenticatorLink::Password(PasswordAuthenticator::new(
                Arc::new(credentials),
                store.clone(),
                config.session_ttl(),
            )),
        ])?;

        let retriever = JsonAttributeRetriever::from_map(HashMap::from([
            (
                "alice".to_string(),
                AttributeSet::new()
                    .with("mail", &["alice@example.com"])
                    .with("role", &["admin", "user"]),
            ),
            (
                USERNAME.to_string(),
                AttributeSet::new().with("mail", &["carol@example.com"]),
            ),
        ]));

        let signer = XmlSigner::from_pem(IDP_KEY.as_bytes(), IDP_CERT.as_bytes())?;
        let idp = providers::assemble(
            &config,
            SigningService::new(Arc::new(signer), Duration::from_secs(5)),
            store.clone(),
            chain,
            Some(anchors),
            Arc::new(retriever),
        )?;

        let router = Server::with_state(config.clone(), idp).test_router();
        Ok(Self {
            router,
            config,
            store,
            backend,
        })
    }

    /// Sends one request through the router.
    pub async fn send(&self, request: Request<Body>) -> anyhow::Result<Response<Body>> {
        Ok(self.router.clone().oneshot(request).await?)
    }

    /// GETs the SSO endpoint for `request`, with extra headers.
    pub async fn sso(
        &self,
        request: &AuthnRequest,
        headers: &[(&str, &str)],
    ) -> anyhow::Result<Response<Body>> {
        let uri = self.sso_uri(request)?;
        let mut builder = Request::get(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::empty())?).await
    }

    /// Returns the SSO URL carrying `request` in the redirect binding.
    pub fn sso_uri(&self, request: &AuthnRequest) -> anyhow::Result<String> {
        Ok(HttpRedirectBinding::encode_request(
            &xml::writer::write_authn_request(request),
            &self.config.sso_path,
            request.relay_state.as_deref(),
        )?)
    }

    /// Submits the login form for `request`.
    pub async fn login(
        &self,
        request: &AuthnRequest,
        username: &str,
        password: &str,
    ) -> anyhow::Result<Response<Body>> {
        let encoded = HttpRedirectBinding::encode_message(&xml::writer::write_authn_request(request))?;
        let mut form = format!(
            "SAMLRequest={}&username={}&password={}",
            urlencoding::encode(&encoded),
            urlencoding::encode(username),
            urlencoding::encode(password)
        );
        if let Some(rs) = &request.relay_state {
            form.push_str(&format!("&RelayState={}", urlencoding::encode(rs)));
        }

        self.send(
            Request::post(&self.config.login_path)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form))?,
        )
        .await
    }

    /// POSTs a SOAP message to `path`.
    pub async fn soap(
        &self,
        path: &str,
        message: &str,
        headers: &[(&str, &str)],
    ) -> anyhow::Result<Response<Body>> {
        let mut builder = Request::post(path).header(header::CONTENT_TYPE, "text/xml");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::from(SoapBinding::encode(message)))?)
            .await
    }
}

/// Builds an AuthnRequest from the test SP.
#[must_use]
pub fn authn_request(binding: SamlBinding) -> AuthnRequest {
    AuthnRequest::new(SP_ENTITY_ID, SP_ACS_URL).with_binding(binding)
}

/// Returns the certificate as a header value, URL-encoded the way a
/// TLS-terminating proxy forwards it.
#[must_use]
pub fn cert_header(pem: &str) -> String {
    urlencoding::encode(pem).into_owned()
}

/// Reads a response body.
pub async fn body_string(response: Response<Body>) -> anyhow::Result<String> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// Returns a header value, if present.
#[must_use]
pub fn header_value(response: &Response<Body>, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Validates the IdP signature over `xml` and returns the signed element's ID.
pub fn verify_signed(xml: &str) -> anyhow::Result<String> {
    Ok(XmlSignatureValidator::from_pem(IDP_CERT.as_bytes())?.validate(xml)?)
}

/// Extracts, verifies and summarizes the response in an auto-POST form.
pub async fn posted_response(response: Response<Body>) -> anyhow::Result<(ResponseSummary, Option<String>)> {
    anyhow::ensure!(response.status() == StatusCode::OK, "status {}", response.status());
    let html = body_string(response).await?;

    let encoded = HttpPostBinding::form_field(&html, "SAMLResponse")
        .ok_or_else(|| anyhow::anyhow!("no SAMLResponse in form"))?;
    let relay_state = HttpPostBinding::form_field(&html, "RelayState");
    let message = HttpPostBinding::decode_response(&encoded)?;

    verify_signed(&message)?;
    let summary = xml::reader::response_summary(&xml::parse_document(&message)?)?;
    Ok((summary, relay_state))
}

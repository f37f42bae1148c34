//! Front-channel SAML handlers.
//!
//! The redirect-binding SSO endpoint and the login form submission. Both turn
//! the request into an [`AuthAttempt`] and hand it to [`process_sso`]; the
//! only difference is whether credentials are present.

use axum::{
    extract::{Query, State},
    http::{header::LOCATION, Extensions, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use idp_auth::{AuthAttempt, Credentials};
use idp_protocol_saml::endpoints::{process_sso, SsoOutcome};
use idp_protocol_saml::marshaller::BindingResponse;
use idp_protocol_saml::types::AuthnRequest;
use serde::Deserialize;

use crate::state::AppState;
use crate::ui::{render_error, render_login, saml_error_page, LoginTemplate};

/// Query parameters of the redirect-binding SSO endpoint.
#[derive(Debug, Deserialize)]
pub struct SsoQuery {
    /// Deflated, base64-encoded AuthnRequest.
    #[serde(rename = "SAMLRequest")]
    pub saml_request: Option<String>,
    /// Opaque service provider state.
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
}

/// Login form submission.
#[derive(Deserialize)]
pub struct LoginForm {
    /// The AuthnRequest the login page was rendered for.
    #[serde(rename = "SAMLRequest")]
    pub saml_request: String,
    /// Relay state.
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// GET handler for the SSO endpoint.
pub async fn sso_redirect(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    Query(query): Query<SsoQuery>,
) -> Response {
    let Some(saml_request) = query.saml_request.filter(|v| !v.is_empty()) else {
        return render_error(
            StatusCode::BAD_REQUEST,
            "Invalid SAML request",
            Some("Missing SAMLRequest parameter"),
        );
    };

    let attempt = transport_attempt(&state, &headers, &extensions);
    handle_sso(&state, &saml_request, query.relay_state.as_deref(), attempt).await
}

/// POST handler for the login form.
pub async fn login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    Form(form): Form<LoginForm>,
) -> Response {
    let attempt = transport_attempt(&state, &headers, &extensions)
        .with_credentials(Credentials::new(form.username, form.password));
    handle_sso(&state, &form.saml_request, form.relay_state.as_deref(), attempt).await
}

/// Collects what the transport presented: a forwarded certificate and the
/// session cookie.
fn transport_attempt(state: &AppState, headers: &HeaderMap, extensions: &Extensions) -> AuthAttempt {
    let mut attempt = AuthAttempt::new();
    if let Some(certificate) = state.idp.forwarded_certificate(headers, extensions) {
        attempt = attempt.with_client_certificate(certificate);
    }
    if let Some(token) = state.session_cookie.extract(headers) {
        attempt = attempt.with_session_token(token);
    }
    attempt
}

async fn handle_sso(
    state: &AppState,
    saml_request: &str,
    relay_state: Option<&str>,
    attempt: AuthAttempt,
) -> Response {
    let request = match state.idp.parser.parse_redirect(saml_request, relay_state) {
        Ok(request) => request,
        Err(e) => return saml_error_page(&e, "sso"),
    };

    match process_sso(&state.idp, &request, attempt).await {
        Ok(SsoOutcome::Challenge(challenge)) => render_login(&LoginTemplate {
            action_url: state.config.login_path.clone(),
            sp_entity_id: request.issuer.clone(),
            saml_request: saml_request.to_string(),
            relay_state: request.relay_state.clone(),
            error: challenge.error,
        }),
        Ok(SsoOutcome::Respond {
            response,
            issued_session,
        }) => deliver(state, &request, response, issued_session.as_deref()),
        Err(e) => saml_error_page(&e, "sso"),
    }
}

fn deliver(
    state: &AppState,
    request: &AuthnRequest,
    response: BindingResponse,
    issued_session: Option<&str>,
) -> Response {
    let mut http = match response {
        BindingResponse::PostForm(html) => Html(html).into_response(),
        BindingResponse::Redirect(location) => {
            (StatusCode::FOUND, [(LOCATION, location)]).into_response()
        }
    };

    if let Some(token) = issued_session {
        tracing::debug!(request_id = %request.id, "Setting SSO session cookie");
        state.session_cookie.set(http.headers_mut(), token);
    }
    http
}

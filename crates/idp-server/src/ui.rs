//! Login and error pages.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use idp_protocol_saml::SamlError;

/// Login page template.
///
/// The original `SAMLRequest` and `RelayState` ride along as hidden fields,
/// so the submission is processed exactly like the redirect that led here.
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    /// Form action URL.
    pub action_url: String,
    /// Service provider entity ID.
    pub sp_entity_id: String,
    /// Encoded AuthnRequest, as received.
    pub saml_request: String,
    /// Relay state.
    pub relay_state: Option<String>,
    /// Error message to display.
    pub error: Option<String>,
}

/// Error page template.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    /// Short error title.
    pub error: String,
    /// Error description.
    pub error_description: Option<String>,
}

fn render(template: &impl Template, status: StatusCode) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Template render error");
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

/// Shows the login page.
pub fn render_login(template: &LoginTemplate) -> Response {
    render(template, StatusCode::OK)
}

/// Shows an error page with the given status.
pub fn render_error(status: StatusCode, error: &str, description: Option<&str>) -> Response {
    render(
        &ErrorTemplate {
            error: error.to_string(),
            error_description: description.map(String::from),
        },
        status,
    )
}

/// Shows a protocol error that cannot be reported to the service provider.
///
/// Server-side failures are logged in full but shown without detail.
pub fn saml_error_page(err: &SamlError, context: &str) -> Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        tracing::error!(error = %err, context, "SAML request failed");
        render_error(status, "The request could not be completed", None)
    } else {
        tracing::warn!(error = %err, context, "SAML request rejected");
        let description = err.to_string();
        render_error(status, "Invalid SAML request", Some(&description))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn login_page_carries_request_and_escapes() {
        let response = render_login(&LoginTemplate {
            action_url: "/login".to_string(),
            sp_entity_id: "https://sp.example.com".to_string(),
            saml_request: "fZBBT+MwEIXij=".to_string(),
            relay_state: Some("<x>".to_string()),
            error: Some("Invalid username or password.".to_string()),
        });
        assert_eq!(response.status(), StatusCode::OK);

        let html = body(response).await;
        assert!(html.contains(r#"name="SAMLRequest""#));
        assert!(html.contains("fZBBT+MwEIXij="));
        assert!(html.contains("&lt;x&gt;"));
        assert!(html.contains("Invalid username or password."));
    }

    #[tokio::test]
    async fn server_errors_are_not_detailed() {
        let err = SamlError::StoreUnavailable("redis at 10.0.0.5 refused".to_string());
        let response = saml_error_page(&err, "sso");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body(response).await.contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn client_errors_are_described() {
        let err = SamlError::MalformedRequest("missing Issuer".to_string());
        let response = saml_error_page(&err, "sso");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body(response).await.contains("missing Issuer"));
    }
}

//! Single Sign-On processing.
//!
//! Runs a parsed AuthnRequest through the authenticator chain and delivers
//! the outcome with the requested binding. The HTTP surface (query parsing,
//! login form, cookies) belongs to the server; this module only decides what
//! to send.

use idp_auth::{AuthAttempt, Challenge, ChainStep, Completion};
use tracing::{info, warn};

use crate::error::SamlResult;
use crate::marshaller::BindingResponse;
use crate::types::{AuthnRequest, Status};

use super::state::IdpState;

/// What the SSO endpoint answers with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsoOutcome {
    /// The user must log in; render the login form.
    Challenge(Challenge),
    /// Deliver a response to the service provider.
    Respond {
        /// Binding-specific payload.
        response: BindingResponse,
        /// Session token to set as a cookie.
        issued_session: Option<String>,
    },
}

/// Processes one AuthnRequest.
///
/// `ForceAuthn` ignores the SSO session. `IsPassive` turns a challenge into a
/// `NoPassive` response. A chain in which no link authenticates the caller
/// yields a signed `AuthnFailed` response rather than an HTTP error.
///
/// # Errors
///
/// Returns `SamlError::UnsupportedBinding` before any other work if the
/// requested binding has no marshaller, and `SigningError` or
/// `StoreUnavailable` when the request cannot be answered at all.
pub async fn process_sso(
    state: &IdpState,
    request: &AuthnRequest,
    mut attempt: AuthAttempt,
) -> SamlResult<SsoOutcome> {
    let marshaller = state.marshallers.get(request.protocol_binding)?;

    if request.force_authn {
        attempt.session_token = None;
    }

    let generator = &state.generator;
    let step = state
        .chain
        .evaluate(&attempt, |completion| async move {
            match completion {
                Completion::Authenticated(auth) => {
                    info!(
                        request_id = %request.id,
                        subject = %auth.principal.subject,
                        method = %auth.principal.method,
                        "Authenticated"
                    );
                    let response = generator.generate(request, &auth.principal).await;
                    (response, auth.issued_session)
                }
                Completion::Failed => {
                    warn!(request_id = %request.id, issuer = %request.issuer, "No authenticator accepted the request");
                    let status = Status::authn_failed("authentication failed");
                    (generator.generate_failure(request, status), None)
                }
            }
        })
        .await?;

    let (response, issued_session) = match step {
        ChainStep::Completed { output, .. } => output,
        ChainStep::Challenged(challenge) if !request.is_passive => {
            return Ok(SsoOutcome::Challenge(challenge));
        }
        ChainStep::Challenged(_) => {
            info!(request_id = %request.id, "Passive request needs interaction");
            (generator.generate_failure(request, Status::no_passive()), None)
        }
    };

    let response = marshaller.marshal(&response, request, &state.signer).await?;
    info!(
        request_id = %request.id,
        binding = %request.protocol_binding,
        "SSO response delivered"
    );

    Ok(SsoOutcome::Respond {
        response,
        issued_session,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::{HttpArtifactBinding, HttpPostBinding};
    use crate::endpoints::test_support::{self, ALICE_CERT};
    use crate::error::SamlError;
    use crate::signature::XmlSignatureValidator;
    use crate::types::{status_codes, sub_status_codes, SamlBinding};
    use crate::xml;
    use idp_auth::Credentials;

    fn request(binding: SamlBinding) -> AuthnRequest {
        AuthnRequest::new("https://sp.example.com", "https://sp.example.com/acs")
            .with_id("r1")
            .with_binding(binding)
    }

    fn posted_summary(outcome: SsoOutcome) -> xml::ResponseSummary {
        let SsoOutcome::Respond {
            response: BindingResponse::PostForm(html),
            ..
        } = outcome
        else {
            panic!("expected a POST form");
        };
        let encoded = HttpPostBinding::form_field(&html, "SAMLResponse").unwrap();
        let xml = HttpPostBinding::decode_response(&encoded).unwrap();

        XmlSignatureValidator::from_pem(test_support::IDP_CERT.as_bytes())
            .unwrap()
            .validate(&xml)
            .unwrap();
        xml::reader::response_summary(&xml::parse_document(&xml).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn certificate_yields_signed_post_response() {
        let state = test_support::state();
        let attempt = AuthAttempt::new().with_client_certificate(ALICE_CERT);

        let outcome = process_sso(&state, &request(SamlBinding::HttpPost), attempt)
            .await
            .unwrap();

        let summary = posted_summary(outcome);
        assert_eq!(summary.in_response_to.as_deref(), Some("r1"));
        assert_eq!(summary.status.code, status_codes::SUCCESS);
        assert_eq!(summary.subject.map(|n| n.value).as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn no_certificate_challenges() {
        let state = test_support::state();
        let outcome = process_sso(&state, &request(SamlBinding::HttpArtifact), AuthAttempt::new())
            .await
            .unwrap();
        assert_eq!(outcome, SsoOutcome::Challenge(Challenge::login()));
    }

    #[tokio::test]
    async fn login_issues_session_and_artifact() {
        let state = test_support::state();
        let attempt = AuthAttempt::new().with_credentials(Credentials::new("carol", "secret"));

        let outcome = process_sso(&state, &request(SamlBinding::HttpArtifact), attempt)
            .await
            .unwrap();

        let SsoOutcome::Respond {
            response: BindingResponse::Redirect(location),
            issued_session: Some(token),
        } = outcome
        else {
            panic!("expected a redirect with a session");
        };
        assert!(HttpArtifactBinding::artifact_from_url(&location).is_some());

        // The session is reused without credentials
        let resumed = process_sso(
            &state,
            &request(SamlBinding::HttpPost),
            AuthAttempt::new().with_session_token(&token),
        )
        .await
        .unwrap();
        assert_eq!(
            posted_summary(resumed).subject.map(|n| n.value).as_deref(),
            Some("carol")
        );

        // ForceAuthn ignores it
        let forced = process_sso(
            &state,
            &request(SamlBinding::HttpPost).with_force_authn(true),
            AuthAttempt::new().with_session_token(&token),
        )
        .await
        .unwrap();
        assert!(matches!(forced, SsoOutcome::Challenge(_)));
    }

    #[tokio::test]
    async fn passive_request_gets_no_passive_response() {
        let state = test_support::state();
        let outcome = process_sso(
            &state,
            &request(SamlBinding::HttpPost).with_is_passive(true),
            AuthAttempt::new(),
        )
        .await
        .unwrap();

        let summary = posted_summary(outcome);
        assert_eq!(summary.status.code, status_codes::RESPONDER);
        assert_eq!(summary.status.sub_code.as_deref(), Some(sub_status_codes::NO_PASSIVE));
    }

    #[tokio::test]
    async fn exhausted_chain_gets_signed_failure() {
        let state = test_support::pki_only_state();
        let outcome = process_sso(&state, &request(SamlBinding::HttpPost), AuthAttempt::new())
            .await
            .unwrap();

        let summary = posted_summary(outcome);
        assert_eq!(summary.in_response_to.as_deref(), Some("r1"));
        assert_eq!(summary.status.sub_code.as_deref(), Some(sub_status_codes::AUTHN_FAILED));
        assert!(summary.subject.is_none());
    }

    #[tokio::test]
    async fn unregistered_binding_fails_first() {
        let state = test_support::state();
        let attempt = AuthAttempt::new().with_client_certificate(ALICE_CERT);

        assert!(matches!(
            process_sso(&state, &request(SamlBinding::HttpRedirect), attempt).await,
            Err(SamlError::UnsupportedBinding(_))
        ));
    }
}

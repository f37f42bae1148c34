//! Response construction.
//!
//! Builds the in-memory [`Response`] for an authenticated principal. Nothing
//! here signs: signature scope depends on the binding, so signing belongs to
//! the marshaller.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use idp_auth::Principal;
use tracing::{debug, warn};

use crate::attributes::{AttributeRetriever, AttributeSet};
use crate::types::{
    Assertion, AttributeQuery, AuthnContextClass, AuthnRequest, AuthnStatement, Conditions,
    NameId, NameIdFormat, Response, Status, Subject, SubjectConfirmationData,
};

/// Default assertion validity.
pub const DEFAULT_ASSERTION_VALIDITY: Duration = Duration::from_secs(300);

/// Default clock skew allowance applied to `NotBefore`.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Builds SAML responses for authenticated principals.
#[derive(Clone)]
pub struct ResponseGenerator {
    entity_id: String,
    retriever: Arc<dyn AttributeRetriever>,
    validity: Duration,
    skew: Duration,
    deadline: Duration,
}

impl ResponseGenerator {
    /// Creates a generator issuing as `entity_id`.
    #[must_use]
    pub fn new(entity_id: impl Into<String>, retriever: Arc<dyn AttributeRetriever>) -> Self {
        Self {
            entity_id: entity_id.into(),
            retriever,
            validity: DEFAULT_ASSERTION_VALIDITY,
            skew: DEFAULT_CLOCK_SKEW,
            deadline: Duration::from_secs(2),
        }
    }

    /// Sets the assertion validity.
    #[must_use]
    pub const fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// Sets the clock skew allowance.
    #[must_use]
    pub const fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.skew = skew;
        self
    }

    /// Sets the deadline for attribute lookups.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Returns the issuing entity ID.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Builds a success response for `principal` answering `request`.
    ///
    /// A failed or late attribute lookup yields an assertion without
    /// attributes rather than an error.
    pub async fn generate(&self, request: &AuthnRequest, principal: &Principal) -> Response {
        let attributes = self.fetch_attributes(&principal.subject).await;
        let now = Utc::now();
        let conditions = self.conditions(now).with_audience(&request.issuer);

        let subject = Subject::new(NameId::with_format(
            &principal.subject,
            response_name_id_format(request),
        ))
        .with_confirmation(SubjectConfirmationData {
            in_response_to: request.id.clone(),
            recipient: request.assertion_consumer_service_url.clone(),
            not_on_or_after: conditions.not_on_or_after,
        });

        let assertion = Assertion::new(&self.entity_id, subject, conditions)
            .with_issue_instant(now)
            .with_attributes(attributes);
        let session_index = assertion.id.clone();
        let assertion = assertion.with_authn_statement(AuthnStatement {
            authn_instant: principal.authn_instant,
            session_index: Some(session_index),
            context_class: AuthnContextClass::from(principal.method),
        });

        debug!(
            request_id = %request.id,
            subject = %principal.subject,
            attributes = assertion.attributes.len(),
            "Generated response"
        );

        Response::success(&self.entity_id, assertion)
            .with_issue_instant(now)
            .in_response_to(&request.id)
            .with_destination(&request.assertion_consumer_service_url)
    }

    /// Builds an assertion-less response carrying a failure `status`.
    #[must_use]
    pub fn generate_failure(&self, request: &AuthnRequest, status: Status) -> Response {
        Response::new(&self.entity_id, status)
            .in_response_to(&request.id)
            .with_destination(&request.assertion_consumer_service_url)
    }

    /// Builds the answer to an attribute query.
    ///
    /// The assertion has no authentication statement and no bearer
    /// confirmation; its audience is the requester.
    #[must_use]
    pub fn attribute_response(&self, query: &AttributeQuery, attributes: AttributeSet) -> Response {
        let now = Utc::now();
        let mut conditions = self.conditions(now);
        if let Some(requester) = &query.issuer {
            conditions = conditions.with_audience(requester);
        }

        let assertion = Assertion::new(&self.entity_id, Subject::new(query.subject.clone()), conditions)
            .with_issue_instant(now)
            .with_attributes(attributes);

        Response::success(&self.entity_id, assertion)
            .with_issue_instant(now)
            .in_response_to(&query.id)
    }

    /// Looks up attributes for `subject` under the deadline.
    pub async fn fetch_attributes(&self, subject: &str) -> AttributeSet {
        match tokio::time::timeout(self.deadline, self.retriever.lookup(subject)).await {
            Ok(Ok(attributes)) => attributes,
            Ok(Err(e)) => {
                warn!(subject, error = %e, "Attribute lookup failed, continuing without attributes");
                AttributeSet::default()
            }
            Err(_) => {
                warn!(subject, "Attribute lookup timed out, continuing without attributes");
                AttributeSet::default()
            }
        }
    }

    fn conditions(&self, now: chrono::DateTime<Utc>) -> Conditions {
        Conditions::window(
            now,
            chrono::Duration::from_std(self.skew).unwrap_or_else(|_| chrono::Duration::zero()),
            chrono::Duration::from_std(self.validity).unwrap_or_else(|_| chrono::Duration::zero()),
        )
    }
}

impl std::fmt::Debug for ResponseGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseGenerator")
            .field("entity_id", &self.entity_id)
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

/// Echoes the requested NameID format when it can describe a stable subject.
fn response_name_id_format(request: &AuthnRequest) -> NameIdFormat {
    request
        .requested_name_id_format()
        .and_then(NameIdFormat::from_uri)
        .filter(|format| format.is_echoable())
        .unwrap_or(NameIdFormat::Unspecified)
}

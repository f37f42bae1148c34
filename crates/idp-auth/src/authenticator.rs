//! Authenticator links.
//!
//! Each link inspects an [`AuthAttempt`] and either authenticates the caller,
//! delegates to the next link, or asks for interactive credentials.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use idp_store::{IdpStore, StoreError};
use tracing::{debug, info, warn};

use crate::credentials::CredentialStore;
use crate::error::{AuthError, AuthResult};
use crate::pki::TrustAnchors;
use crate::principal::{AuthMethod, Principal};

/// Username and password submitted through the login form.
#[derive(Clone)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// What the transport and user agent presented for one request.
#[derive(Debug, Clone, Default)]
pub struct AuthAttempt {
    /// Forwarded client certificate header value.
    pub client_certificate: Option<String>,
    /// SSO session token from the session cookie.
    pub session_token: Option<String>,
    /// Login form submission.
    pub credentials: Option<Credentials>,
}

impl AuthAttempt {
    /// Creates an empty attempt.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the forwarded client certificate.
    #[must_use]
    pub fn with_client_certificate(mut self, value: impl Into<String>) -> Self {
        self.client_certificate = Some(value.into());
        self
    }

    /// Sets the session token.
    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Sets submitted credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

/// A successful authentication.
#[derive(Debug, Clone)]
pub struct Authentication {
    /// The authenticated principal.
    pub principal: Principal,
    /// Session token issued by this authentication, to be set as a cookie.
    pub issued_session: Option<String>,
}

/// Interactive login is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Challenge {
    /// Message for the login form after a rejected submission.
    pub error: Option<String>,
}

impl Challenge {
    /// Challenge for a first visit.
    #[must_use]
    pub const fn login() -> Self {
        Self { error: None }
    }

    /// Challenge after rejected credentials.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }
}

/// Result of one link.
#[derive(Debug, Clone)]
pub enum LinkOutcome {
    /// The link authenticated the caller.
    Success(Authentication),
    /// The link does not apply; try the next one.
    Delegate,
    /// The user must submit credentials.
    Challenge(Challenge),
}

/// Client certificate authenticator.
#[derive(Debug, Clone)]
pub struct PkiAuthenticator {
    anchors: Arc<TrustAnchors>,
}

impl PkiAuthenticator {
    /// Creates an authenticator trusting `anchors`.
    #[must_use]
    pub const fn new(anchors: Arc<TrustAnchors>) -> Self {
        Self { anchors }
    }

    /// Authenticates from the client certificate, if one verifies.
    ///
    /// Absent and invalid certificates both delegate without side effects.
    #[must_use]
    pub fn attempt(&self, attempt: &AuthAttempt) -> LinkOutcome {
        let Some(header) = attempt.client_certificate.as_deref() else {
            return LinkOutcome::Delegate;
        };

        match self.anchors.verify_header(header) {
            Ok(subject) => {
                info!(subject = %subject, "Authenticated by client certificate");
                LinkOutcome::Success(Authentication {
                    principal: Principal::new(subject, AuthMethod::Pki),
                    issued_session: None,
                })
            }
            Err(e) => {
                debug!(error = %e, "Client certificate rejected, delegating");
                LinkOutcome::Delegate
            }
        }
    }
}

/// Message shown on the login form after rejected credentials.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password.";

/// Interactive username and password authenticator.
///
/// Always terminal: it never delegates.
#[derive(Clone)]
pub struct PasswordAuthenticator {
    credentials: Arc<dyn CredentialStore>,
    store: IdpStore,
    session_ttl: Duration,
}

impl fmt::Debug for PasswordAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordAuthenticator")
            .field("store", &self.store)
            .field("session_ttl", &self.session_ttl)
            .finish_non_exhaustive()
    }
}

impl PasswordAuthenticator {
    /// Creates a password authenticator that records sessions in `store`.
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialStore>, store: IdpStore, session_ttl: Duration) -> Self {
        Self {
            credentials,
            store,
            session_ttl,
        }
    }

    /// Resumes an SSO session or verifies submitted credentials.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the session store is unavailable.
    pub async fn attempt(&self, attempt: &AuthAttempt) -> AuthResult<LinkOutcome> {
        if let Some(token) = attempt.session_token.as_deref() {
            match self.store.get_session::<Principal>(token).await {
                Ok(principal) => {
                    debug!(subject = %principal.subject, "Resumed SSO session");
                    return Ok(LinkOutcome::Success(Authentication {
                        principal,
                        issued_session: None,
                    }));
                }
                Err(StoreError::NotFound) => debug!("Session cookie did not resolve"),
                Err(e) => return Err(e.into()),
            }
        }

        let Some(credentials) = attempt.credentials.as_ref() else {
            return Ok(LinkOutcome::Challenge(Challenge::login()));
        };

        match self
            .credentials
            .verify(&credentials.username, &credentials.password)
            .await
        {
            Ok(subject) => {
                let principal = Principal::new(subject, AuthMethod::Password);
                let token = idp_crypto::generate_session_token();
                self.store
                    .put_session(&token, &principal, self.session_ttl)
                    .await?;
                info!(subject = %principal.subject, "Authenticated by password");
                Ok(LinkOutcome::Success(Authentication {
                    principal,
                    issued_session: Some(token),
                }))
            }
            Err(AuthError::InvalidCredentials) => {
                warn!(username = %credentials.username, "Rejected login");
                Ok(LinkOutcome::Challenge(Challenge::rejected(
                    INVALID_CREDENTIALS_MESSAGE,
                )))
            }
            Err(e) => Err(e),
        }
    }
}

/// One link of the authenticator chain.
#[derive(Debug, Clone)]
pub enum AuthenticatorLink {
    /// Client certificate.
    Pki(PkiAuthenticator),
    /// Username and password, terminal.
    Password(PasswordAuthenticator),
}

impl AuthenticatorLink {
    /// Returns the method this link authenticates with.
    #[must_use]
    pub const fn method(&self) -> AuthMethod {
        match self {
            Self::Pki(_) => AuthMethod::Pki,
            Self::Password(_) => AuthMethod::Password,
        }
    }

    /// Returns true if this link can only appear last.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Password(_))
    }

    /// Runs this link.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure failures.
    pub async fn attempt(&self, attempt: &AuthAttempt) -> AuthResult<LinkOutcome> {
        match self {
            Self::Pki(link) => Ok(link.attempt(attempt)),
            Self::Password(link) => link.attempt(attempt).await,
        }
    }
}

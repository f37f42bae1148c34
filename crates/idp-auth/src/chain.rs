//! Ordered authenticator chain.
//!
//! Links run in configured order. The first link that authenticates ends the
//! chain; a challenge suspends it until the login form is submitted as a new
//! request. If every link delegates, the chain fails.
//!
//! The completion callback is taken by value (`FnOnce`) and is called at most
//! once, after which the chain returns. A challenge does not complete the
//! request.

use std::fmt;
use std::future::Future;

use tracing::debug;

use crate::authenticator::{AuthAttempt, Authentication, AuthenticatorLink, Challenge, LinkOutcome};
use crate::error::{AuthError, AuthResult};
use crate::principal::AuthMethod;

/// Where a request stands in the authentication flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Links are being evaluated.
    Pending,
    /// The login form was served; waiting for a submission.
    AwaitingCredentials,
    /// A link authenticated the caller.
    Authenticated,
    /// Every link delegated.
    Failed,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::AwaitingCredentials => "awaiting_credentials",
            Self::Authenticated => "authenticated",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Final result handed to the completion callback.
#[derive(Debug, Clone)]
pub enum Completion {
    /// A link authenticated the caller.
    Authenticated(Authentication),
    /// No link authenticated the caller.
    Failed,
}

/// Result of evaluating the chain for one request.
#[derive(Debug)]
pub enum ChainStep<T> {
    /// The completion callback ran and produced `T`.
    Completed {
        /// Terminal state reached.
        state: FlowState,
        /// Callback output.
        output: T,
    },
    /// Interactive credentials are needed; the callback did not run.
    Challenged(Challenge),
}

impl<T> ChainStep<T> {
    /// Returns the flow state this step ended in.
    #[must_use]
    pub const fn state(&self) -> FlowState {
        match self {
            Self::Completed { state, .. } => *state,
            Self::Challenged(_) => FlowState::AwaitingCredentials,
        }
    }
}

/// Ordered list of authenticator links.
#[derive(Debug, Clone)]
pub struct AuthenticatorChain {
    links: Vec<AuthenticatorLink>,
}

impl AuthenticatorChain {
    /// Creates a chain.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidChain` if the chain is empty or a terminal
    /// link is followed by another link.
    pub fn new(links: Vec<AuthenticatorLink>) -> AuthResult<Self> {
        if links.is_empty() {
            return Err(AuthError::InvalidChain("no authenticators configured".to_string()));
        }
        if let Some(position) = links.iter().position(AuthenticatorLink::is_terminal) {
            if position + 1 != links.len() {
                return Err(AuthError::InvalidChain(format!(
                    "{} authenticator must be last",
                    links[position].method()
                )));
            }
        }
        Ok(Self { links })
    }

    /// Methods of the configured links, in evaluation order.
    pub fn methods(&self) -> impl Iterator<Item = AuthMethod> + '_ {
        self.links.iter().map(AuthenticatorLink::method)
    }

    /// Returns true if the chain can issue an interactive challenge.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.links.last().is_some_and(AuthenticatorLink::is_terminal)
    }

    /// Evaluates the chain for one request.
    ///
    /// `on_complete` runs exactly once if the chain reaches `Authenticated`
    /// or `Failed`, and never if it ends in a challenge.
    ///
    /// # Errors
    ///
    /// Returns an error if a link hits an infrastructure failure. The
    /// callback does not run in that case.
    pub async fn evaluate<F, Fut, T>(&self, attempt: &AuthAttempt, on_complete: F) -> AuthResult<ChainStep<T>>
    where
        F: FnOnce(Completion) -> Fut,
        Fut: Future<Output = T>,
    {
        let mut state = FlowState::Pending;
        debug!(state = %state, links = self.links.len(), "Evaluating authenticator chain");

        for link in &self.links {
            match link.attempt(attempt).await? {
                LinkOutcome::Success(authentication) => {
                    state = FlowState::Authenticated;
                    debug!(link = %link.method(), state = %state, "Link authenticated caller");
                    let output = on_complete(Completion::Authenticated(authentication)).await;
                    return Ok(ChainStep::Completed { state, output });
                }
                LinkOutcome::Delegate => {
                    debug!(link = %link.method(), "Link delegated");
                }
                LinkOutcome::Challenge(challenge) => {
                    state = FlowState::AwaitingCredentials;
                    debug!(link = %link.method(), state = %state, "Link issued challenge");
                    return Ok(ChainStep::Challenged(challenge));
                }
            }
        }

        state = FlowState::Failed;
        debug!(state = %state, "Authenticator chain exhausted");
        let output = on_complete(Completion::Failed).await;
        Ok(ChainStep::Completed { state, output })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authenticator::{Credentials, PasswordAuthenticator, PkiAuthenticator};
    use crate::credentials::CredentialStore;
    use crate::pki::TrustAnchors;
    use async_trait::async_trait;
    use idp_store::{IdpStore, MemoryStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const CA: &str = include_str!("../../../tests/fixtures/ca.crt");
    const ALICE: &str = include_str!("../../../tests/fixtures/alice.crt");
    const MALLORY: &str = include_str!("../../../tests/fixtures/mallory.crt");

    /// Accepts "dave"/"pw" and counts every call.
    #[derive(Default)]
    struct CountingCredentials {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CredentialStore for CountingCredentials {
        async fn verify(&self, username: &str, password: &str) -> AuthResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if username == "dave" && password == "pw" {
                Ok(username.to_string())
            } else {
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    fn pki_link() -> AuthenticatorLink {
        let anchors = TrustAnchors::from_pem(CA.as_bytes()).unwrap();
        AuthenticatorLink::Pki(PkiAuthenticator::new(Arc::new(anchors)))
    }

    fn password_link(credentials: Arc<CountingCredentials>) -> AuthenticatorLink {
        let store = IdpStore::new(Arc::new(MemoryStore::new()), Duration::from_secs(2));
        AuthenticatorLink::Password(PasswordAuthenticator::new(
            credentials,
            store,
            Duration::from_secs(60),
        ))
    }

    fn default_chain() -> (AuthenticatorChain, Arc<CountingCredentials>) {
        let credentials = Arc::new(CountingCredentials::default());
        let chain =
            AuthenticatorChain::new(vec![pki_link(), password_link(Arc::clone(&credentials))]).unwrap();
        (chain, credentials)
    }

    #[test]
    fn password_must_be_last() {
        let credentials = Arc::new(CountingCredentials::default());
        let result = AuthenticatorChain::new(vec![password_link(credentials), pki_link()]);
        assert!(matches!(result, Err(AuthError::InvalidChain(_))));
        assert!(matches!(
            AuthenticatorChain::new(Vec::new()),
            Err(AuthError::InvalidChain(_))
        ));
    }

    #[test]
    fn methods_follow_configured_order() {
        let (chain, _) = default_chain();
        let methods: Vec<_> = chain.methods().collect();
        assert_eq!(methods, vec![AuthMethod::Pki, AuthMethod::Password]);
        assert!(chain.is_interactive());
    }

    #[tokio::test]
    async fn certificate_short_circuits_password_link() {
        let (chain, credentials) = default_chain();
        let attempt = AuthAttempt::new()
            .with_client_certificate(ALICE)
            .with_credentials(Credentials::new("dave", "pw"));

        let calls = AtomicUsize::new(0);
        let step = chain
            .evaluate(&attempt, |completion| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { completion }
            })
            .await
            .unwrap();

        assert_eq!(step.state(), FlowState::Authenticated);
        let ChainStep::Completed {
            output: Completion::Authenticated(auth),
            ..
        } = step
        else {
            panic!("expected authentication");
        };
        assert_eq!(auth.principal.subject, "alice");
        assert_eq!(auth.principal.method, AuthMethod::Pki);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(credentials.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn untrusted_certificate_falls_through_to_challenge() {
        let (chain, _) = default_chain();
        let attempt = AuthAttempt::new().with_client_certificate(MALLORY);

        let calls = AtomicUsize::new(0);
        let step = chain
            .evaluate(&attempt, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {}
            })
            .await
            .unwrap();

        assert!(matches!(step, ChainStep::Challenged(Challenge { error: None })));
        assert_eq!(step.state(), FlowState::AwaitingCredentials);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn form_submission_completes_once() {
        let (chain, credentials) = default_chain();
        let attempt = AuthAttempt::new().with_credentials(Credentials::new("dave", "pw"));

        let calls = AtomicUsize::new(0);
        let step = chain
            .evaluate(&attempt, |completion| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { matches!(completion, Completion::Authenticated(_)) }
            })
            .await
            .unwrap();

        assert!(matches!(step, ChainStep::Completed { output: true, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(credentials.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_chain_completes_with_failure() {
        let chain = AuthenticatorChain::new(vec![pki_link()]).unwrap();
        assert!(!chain.is_interactive());

        let step = chain
            .evaluate(&AuthAttempt::new(), |completion| async move { completion })
            .await
            .unwrap();

        assert_eq!(step.state(), FlowState::Failed);
        assert!(matches!(
            step,
            ChainStep::Completed {
                output: Completion::Failed,
                ..
            }
        ));
    }
}

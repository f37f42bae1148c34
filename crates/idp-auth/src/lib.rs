//! # idp-auth
//!
//! Authentication for the lite-idp identity provider.
//!
//! This crate turns what a request presented (a forwarded client certificate,
//! an SSO session cookie, a login form submission) into an authenticated
//! [`Principal`], through an ordered [`AuthenticatorChain`].
//!
//! ## Features
//!
//! - X.509 client certificate verification against configured trust anchors
//! - Argon2id password hashing and a JSON credential backend
//! - SSO session reuse through the shared `idp-store`
//! - Exactly-once completion per request
//!
//! ## Example
//!
//! ```ignore
//! use idp_auth::{AuthAttempt, AuthenticatorChain, ChainStep, Completion};
//!
//! let chain = AuthenticatorChain::new(vec![pki_link, password_link])?;
//! let step = chain
//!     .evaluate(&attempt, |completion| async move {
//!         match completion {
//!             Completion::Authenticated(auth) => respond(auth.principal).await,
//!             Completion::Failed => respond_failure().await,
//!         }
//!     })
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod authenticator;
pub mod chain;
pub mod credentials;
pub mod error;
pub mod password;
pub mod pki;
pub mod principal;

pub use authenticator::{
    AuthAttempt, Authentication, AuthenticatorLink, Challenge, Credentials, LinkOutcome,
    PasswordAuthenticator, PkiAuthenticator, INVALID_CREDENTIALS_MESSAGE,
};
pub use chain::{AuthenticatorChain, ChainStep, Completion, FlowState};
pub use credentials::{CredentialStore, JsonCredentialStore};
pub use error::{AuthError, AuthResult};
pub use password::{PasswordHasherService, PasswordPolicy};
pub use pki::{decode_certificate_header, TrustAnchors};
pub use principal::{AuthMethod, Principal};

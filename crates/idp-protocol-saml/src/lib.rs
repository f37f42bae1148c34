//! # idp-protocol-saml
//!
//! SAML 2.0 identity provider protocol engine for lite-idp.
//!
//! - **AuthnRequest parsing** - HTTP-Redirect decoding into a typed request
//! - **Response generation** - assertions with subject, conditions and attributes
//! - **XML signature** - enveloped RSA-SHA256 signing and validation
//! - **Marshalling** - HTTP-POST forms and HTTP-Artifact redirects
//! - **SOAP services** - artifact resolution and attribute queries
//!
//! # Modules
//!
//! - [`types`] - protocol messages and constants
//! - [`xml`] - reading and writing those messages
//! - [`bindings`] - Redirect, POST, Artifact and SOAP encodings
//! - [`signature`] - signer, validator and the deadline-bounded signing service
//! - [`parser`], [`generator`], [`marshaller`] - the SSO pipeline
//! - [`attributes`] - subject attribute lookup
//! - [`endpoints`] - request processing and the SOAP router
//!
//! # Example
//!
//! ```rust,ignore
//! use idp_protocol_saml::endpoints::{process_sso, soap_router, IdpState};
//!
//! let state = IdpState::builder(entity_id, signer, store).chain(chain).build()?;
//! let request = state.parser.parse_redirect(&saml_request, relay_state.as_deref())?;
//! let outcome = process_sso(&state, &request, attempt).await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod attributes;
pub mod bindings;
pub mod endpoints;
pub mod error;
pub mod generator;
pub mod marshaller;
pub mod parser;
pub mod signature;
pub mod types;
pub mod xml;

pub use error::{SamlError, SamlResult};

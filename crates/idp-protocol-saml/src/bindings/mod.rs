//! SAML bindings.
//!
//! - **HTTP-Redirect** - inbound AuthnRequests, deflated and base64-encoded in the query
//! - **HTTP-POST** - outbound responses in an auto-submitting HTML form
//! - **HTTP-Artifact** - outbound artifact handles in a redirect query
//! - **SOAP** - back-channel artifact resolution and attribute queries
//!
//! # Usage
//!
//! ```rust,ignore
//! use idp_protocol_saml::bindings::{HttpPostBinding, HttpRedirectBinding};
//!
//! let xml = HttpRedirectBinding::decode_request(&params.saml_request)?;
//! let html = HttpPostBinding::encode_response(&signed_xml, &acs_url, relay_state.as_deref());
//! ```

mod artifact;
mod post;
mod redirect;
mod soap;

pub use artifact::*;
pub use post::*;
pub use redirect::*;
pub use soap::*;

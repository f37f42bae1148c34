//! SAML 2.0 types and data structures.
//!
//! Requests, responses, assertions and the artifact and attribute query
//! messages this IdP exchanges.

mod artifact;
mod assertion;
mod attribute_query;
mod authn_request;
mod constants;
mod name_id;
mod response;
mod status;

pub use artifact::*;
pub use assertion::*;
pub use attribute_query::*;
pub use authn_request::*;
pub use constants::*;
pub use name_id::*;
pub use response::*;
pub use status::*;

/// Generates a protocol message ID.
///
/// IDs start with `_` so they are valid `xs:ID` values.
#[must_use]
pub fn generate_id() -> String {
    format!("_{}", uuid::Uuid::new_v4().simple())
}

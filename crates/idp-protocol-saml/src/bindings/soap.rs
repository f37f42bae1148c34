//! SOAP binding for the back-channel endpoints.
//!
//! ArtifactResolve and AttributeQuery arrive as SOAP 1.1 envelopes posted by
//! the service provider; answers go back the same way.

use crate::error::SamlResult;
use crate::xml::{self, Element};

/// Content type of SOAP 1.1 messages.
pub const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// SOAP binding encoder/decoder.
pub struct SoapBinding;

impl SoapBinding {
    /// Parses a posted envelope and returns the protocol message inside it.
    ///
    /// A bare protocol message without an envelope is accepted as well.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::MalformedRequest` for ill-formed XML or an empty body.
    pub fn decode(body: &str) -> SamlResult<Element> {
        xml::soap_body(xml::parse_document(body)?)
    }

    /// Wraps a protocol message in an envelope.
    #[must_use]
    pub fn encode(message: &str) -> String {
        xml::soap_envelope(message)
    }
}

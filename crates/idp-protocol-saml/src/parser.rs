//! Redirect-binding AuthnRequest parsing.

use std::collections::HashSet;

use tracing::debug;

use crate::bindings::HttpRedirectBinding;
use crate::error::{SamlError, SamlResult};
use crate::types::{AuthnRequest, SamlBinding};
use crate::xml;

/// Decodes `SAMLRequest` values into [`AuthnRequest`]s.
///
/// Pure: no store or signer is touched. A request for a response binding
/// without a registered marshaller is rejected here, before any other work.
#[derive(Debug, Clone)]
pub struct RequestParser {
    supported: HashSet<SamlBinding>,
}

impl RequestParser {
    /// Creates a parser accepting the given response bindings.
    #[must_use]
    pub fn new(supported: impl IntoIterator<Item = SamlBinding>) -> Self {
        Self {
            supported: supported.into_iter().collect(),
        }
    }

    /// Returns true if `binding` is accepted.
    #[must_use]
    pub fn supports(&self, binding: SamlBinding) -> bool {
        self.supported.contains(&binding)
    }

    /// Parses a redirect-binding request.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::MalformedRequest` if decoding or a required field
    /// fails, and `SamlError::UnsupportedBinding` if the requested binding
    /// has no marshaller.
    pub fn parse_redirect(&self, saml_request: &str, relay_state: Option<&str>) -> SamlResult<AuthnRequest> {
        let xml = HttpRedirectBinding::decode_request(saml_request)?;
        let mut request = xml::reader::authn_request(&xml::parse_document(&xml)?)?;

        if !self.supports(request.protocol_binding) {
            return Err(SamlError::UnsupportedBinding(
                request.protocol_binding.uri().to_string(),
            ));
        }

        request.relay_state = relay_state
            .filter(|rs| !rs.is_empty())
            .map(String::from);

        debug!(
            request_id = %request.id,
            issuer = %request.issuer,
            binding = %request.protocol_binding,
            "Parsed AuthnRequest"
        );
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::writer::write_authn_request;

    fn encoded(request: &AuthnRequest) -> String {
        HttpRedirectBinding::encode_message(&write_authn_request(request)).unwrap()
    }

    fn parser() -> RequestParser {
        RequestParser::new([SamlBinding::HttpPost, SamlBinding::HttpArtifact])
    }

    #[test]
    fn parse_is_lossless_on_identity_fields() {
        for binding in [SamlBinding::HttpPost, SamlBinding::HttpArtifact] {
            let request = AuthnRequest::new("https://sp.example.com", "https://sp.example.com/acs")
                .with_binding(binding);

            let parsed = parser().parse_redirect(&encoded(&request), Some("rs")).unwrap();
            assert_eq!(parsed.id, request.id);
            assert_eq!(parsed.issuer, request.issuer);
            assert_eq!(parsed.protocol_binding, binding);
            assert_eq!(parsed.relay_state.as_deref(), Some("rs"));
        }
    }

    #[test]
    fn unregistered_binding_is_unsupported() {
        let request = AuthnRequest::new("sp", "https://sp.example.com/acs")
            .with_binding(SamlBinding::HttpRedirect);

        assert!(matches!(
            parser().parse_redirect(&encoded(&request), None),
            Err(SamlError::UnsupportedBinding(_))
        ));
        assert!(!parser().supports(SamlBinding::Soap));
    }

    #[test]
    fn undecodable_request_is_malformed() {
        assert!(matches!(
            parser().parse_redirect("not a request", None),
            Err(SamlError::MalformedRequest(_))
        ));

        let not_authn = HttpRedirectBinding::encode_message("<samlp:LogoutRequest ID=\"x\"/>").unwrap();
        assert!(matches!(
            parser().parse_redirect(&not_authn, None),
            Err(SamlError::MalformedRequest(_))
        ));
    }

    #[test]
    fn relative_acs_url_is_malformed() {
        let request = AuthnRequest::new("sp", "/acs").with_binding(SamlBinding::HttpArtifact);
        assert!(matches!(
            parser().parse_redirect(&encoded(&request), None),
            Err(SamlError::MalformedRequest(_))
        ));
    }

    #[test]
    fn empty_relay_state_is_dropped() {
        let request = AuthnRequest::new("sp", "https://sp.example.com/acs");
        let parsed = parser().parse_redirect(&encoded(&request), Some("")).unwrap();
        assert!(parsed.relay_state.is_none());
    }
}

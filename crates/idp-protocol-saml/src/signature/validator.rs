//! XML signature validation.
//!
//! Used by the test suite and by service-provider tooling to check what the
//! IdP emits against its public certificate.

use base64::{engine::general_purpose::STANDARD, Engine};
use idp_crypto::RsaAlgorithm;
use x509_parser::prelude::*;

use crate::error::{SamlError, SamlResult};
use crate::types::{canonicalization_algorithms, digest_algorithms, signature_algorithms};

use super::signer::pem_block;
use super::{canonicalize, locate_element, signature_range};

/// Validates enveloped signatures against one trusted certificate.
#[derive(Debug, Clone)]
pub struct XmlSignatureValidator {
    public_key: Vec<u8>,
}

impl XmlSignatureValidator {
    /// Creates a validator from a DER certificate.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::Configuration` if the certificate does not parse.
    pub fn new(certificate_der: &[u8]) -> SamlResult<Self> {
        let (_, cert) = X509Certificate::from_der(certificate_der)
            .map_err(|e| SamlError::Configuration(format!("certificate: {e}")))?;
        Ok(Self {
            public_key: cert.public_key().subject_public_key.data.to_vec(),
        })
    }

    /// Creates a validator from a PEM certificate.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::Configuration` if no certificate block parses.
    pub fn from_pem(certificate_pem: &[u8]) -> SamlResult<Self> {
        let der = pem_block(certificate_pem, &["CERTIFICATE"])
            .ok_or_else(|| SamlError::Configuration("no certificate PEM block".to_string()))?;
        Self::new(&der)
    }

    /// Validates the first signature in `xml` and returns the ID it covers.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::SignatureInvalid` if there is no signature or it
    /// does not verify.
    pub fn validate(&self, xml: &str) -> SamlResult<String> {
        let range = signature_range(xml).ok_or_else(|| invalid("no Signature element"))?;
        let uri = attribute(&xml[range], "<ds:Reference", "URI")
            .ok_or_else(|| invalid("no Reference URI"))?;
        let id = uri
            .strip_prefix('#')
            .ok_or_else(|| invalid("Reference URI is not a same-document reference"))?
            .to_string();

        self.validate_reference(xml, &id)?;
        Ok(id)
    }

    /// Validates the enveloped signature of the element carrying `ID="id"`.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::SignatureInvalid` if the element is missing or
    /// unsigned, the reference or algorithms differ, the digest does not match
    /// or the signature value does not verify.
    pub fn validate_reference(&self, xml: &str, id: &str) -> SamlResult<()> {
        let span = locate_element(xml, id)
            .ok_or_else(|| invalid(&format!("element {id:?} not found")))?;
        let element = &xml[span.start..span.end];

        let range = signature_range(element).ok_or_else(|| invalid("element is not signed"))?;
        let signature = &element[range.clone()];

        let signed_info = enclosed(signature, "<ds:SignedInfo", "</ds:SignedInfo>")
            .ok_or_else(|| invalid("no SignedInfo"))?;

        if attribute(signed_info, "<ds:Reference", "URI") != Some(format!("#{id}")) {
            return Err(invalid("Reference URI does not match the signed element"));
        }
        if attribute(signed_info, "<ds:SignatureMethod", "Algorithm").as_deref()
            != Some(signature_algorithms::RSA_SHA256)
        {
            return Err(invalid("unsupported signature algorithm"));
        }
        if attribute(signed_info, "<ds:DigestMethod", "Algorithm").as_deref()
            != Some(digest_algorithms::SHA256)
        {
            return Err(invalid("unsupported digest algorithm"));
        }

        if attribute(signed_info, "<ds:CanonicalizationMethod", "Algorithm").as_deref()
            != Some(canonicalization_algorithms::EXCLUSIVE_C14N)
        {
            return Err(invalid("unsupported canonicalization algorithm"));
        }

        // Enveloped signature transform, then exclusive C14N
        let unsigned = format!("{}{}", &element[..range.start], &element[range.end..]);
        let canonical = canonicalize(&unsigned).map_err(|e| invalid(&e.to_string()))?;
        let digest = STANDARD.encode(idp_crypto::sha256(canonical.as_bytes()));
        let expected = text(signed_info, "DigestValue").ok_or_else(|| invalid("no DigestValue"))?;
        if digest != expected {
            return Err(invalid("digest mismatch"));
        }

        let value = text(signature, "SignatureValue").ok_or_else(|| invalid("no SignatureValue"))?;
        let value = STANDARD
            .decode(value)
            .map_err(|e| invalid(&format!("SignatureValue encoding: {e}")))?;

        let canonical_signed_info = canonicalize(signed_info).map_err(|e| invalid(&e.to_string()))?;
        let verified = idp_crypto::rsa_verify(
            &self.public_key,
            canonical_signed_info.as_bytes(),
            &value,
            RsaAlgorithm::Rs256,
        )
        .map_err(|e| invalid(&e.to_string()))?;

        if verified {
            Ok(())
        } else {
            Err(invalid("signature value does not verify"))
        }
    }
}

fn invalid(msg: &str) -> SamlError {
    SamlError::SignatureInvalid(msg.to_string())
}

/// Returns `xml` from the first `open` through the following `close`.
fn enclosed<'a>(xml: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = xml.find(open)?;
    let end = start + xml[start..].find(close)? + close.len();
    Some(&xml[start..end])
}

/// Returns the text of the first `ds:<name>` element, whitespace stripped.
fn text(xml: &str, name: &str) -> Option<String> {
    let open = format!("<ds:{name}>");
    let close = format!("</ds:{name}>");
    let inner = enclosed(xml, &open, &close)?;
    Some(
        inner[open.len()..inner.len() - close.len()]
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect(),
    )
}

fn attribute(xml: &str, tag: &str, name: &str) -> Option<String> {
    let start = xml.find(tag)?;
    let tag_end = start + xml[start..].find('>')?;
    let open_tag = &xml[start..tag_end];

    let marker = format!(" {name}=\"");
    let value_start = open_tag.find(&marker)? + marker.len();
    let value_len = open_tag[value_start..].find('"')?;
    Some(open_tag[value_start..value_start + value_len].to_string())
}

//! XML signature creation.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use idp_crypto::RsaAlgorithm;
use tracing::debug;
use x509_parser::pem::Pem;
use x509_parser::prelude::*;

use crate::error::{SamlError, SamlResult};
use crate::types::{canonicalization_algorithms, digest_algorithms, signature_algorithms, XMLDSIG_NS};

use super::{canonicalize, locate_element, DocumentSigner};

const ISSUER_CLOSE: &str = "</saml:Issuer>";

/// RSA-SHA256 enveloped signer holding the IdP key and certificate.
pub struct XmlSigner {
    private_key_der: Vec<u8>,
    certificate_der: Vec<u8>,
}

impl XmlSigner {
    /// Creates a signer from DER key material.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::SigningError` if the key is not an RSA key or the
    /// certificate's public key does not belong to it.
    pub fn new(private_key_der: Vec<u8>, certificate_der: Vec<u8>) -> SamlResult<Self> {
        let key_public = idp_crypto::rsa_public_key_der(&private_key_der)
            .map_err(|e| SamlError::SigningError(format!("signing key: {e}")))?;

        let (_, cert) = X509Certificate::from_der(&certificate_der)
            .map_err(|e| SamlError::SigningError(format!("signing certificate: {e}")))?;
        if cert.public_key().subject_public_key.data.as_ref() != key_public.as_slice() {
            return Err(SamlError::SigningError(
                "certificate does not match the signing key".to_string(),
            ));
        }

        Ok(Self {
            private_key_der,
            certificate_der,
        })
    }

    /// Creates a signer from PEM key and certificate.
    ///
    /// The key may be PKCS#8 (`PRIVATE KEY`) or PKCS#1 (`RSA PRIVATE KEY`).
    ///
    /// # Errors
    ///
    /// Returns `SamlError::Configuration` if either PEM block is missing, and
    /// the errors of [`XmlSigner::new`].
    pub fn from_pem(private_key_pem: &[u8], certificate_pem: &[u8]) -> SamlResult<Self> {
        let key = pem_block(private_key_pem, &["PRIVATE KEY", "RSA PRIVATE KEY"])
            .ok_or_else(|| SamlError::Configuration("no private key PEM block".to_string()))?;
        let cert = pem_block(certificate_pem, &["CERTIFICATE"])
            .ok_or_else(|| SamlError::Configuration("no certificate PEM block".to_string()))?;
        Self::new(key, cert)
    }

    /// Loads the key and certificate from PEM files.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::Configuration` if a file cannot be read, and the
    /// errors of [`XmlSigner::from_pem`].
    pub fn from_pem_files(key_path: impl AsRef<Path>, cert_path: impl AsRef<Path>) -> SamlResult<Self> {
        let read = |path: &Path| {
            std::fs::read(path)
                .map_err(|e| SamlError::Configuration(format!("{}: {e}", path.display())))
        };
        Self::from_pem(&read(key_path.as_ref())?, &read(cert_path.as_ref())?)
    }
}

impl DocumentSigner for XmlSigner {
    fn sign(&self, xml: &str, reference_id: &str) -> SamlResult<String> {
        let span = locate_element(xml, reference_id).ok_or_else(|| {
            SamlError::SigningError(format!("element with ID {reference_id:?} not found"))
        })?;

        // The signature goes right after the signed element's own Issuer
        let insert_at = xml[span.open_end..span.end]
            .find(ISSUER_CLOSE)
            .map(|pos| span.open_end + pos + ISSUER_CLOSE.len())
            .ok_or_else(|| SamlError::SigningError("signed element has no Issuer".to_string()))?;

        // Not signed yet, so the enveloped transform is the identity here
        let element = canonicalize(&xml[span.start..span.end]).map_err(signing_error)?;
        let digest = STANDARD.encode(idp_crypto::sha256(element.as_bytes()));

        let signed_info = build_signed_info(reference_id, &digest);
        let canonical_signed_info = canonicalize(&signed_info).map_err(signing_error)?;
        let signature_value = idp_crypto::rsa_sign(
            &self.private_key_der,
            canonical_signed_info.as_bytes(),
            RsaAlgorithm::Rs256,
        )
        .map_err(|e| SamlError::SigningError(e.to_string()))?;

        let signature = build_signature_element(
            &signed_info,
            &STANDARD.encode(signature_value),
            &self.certificate_der,
        );

        let mut signed = String::with_capacity(xml.len() + signature.len());
        signed.push_str(&xml[..insert_at]);
        signed.push_str(&signature);
        signed.push_str(&xml[insert_at..]);

        debug!(reference_id, "Signed document");
        Ok(signed)
    }

    fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }
}

fn signing_error(e: SamlError) -> SamlError {
    SamlError::SigningError(e.to_string())
}

/// Returns the contents of the first PEM block carrying one of `labels`.
pub(crate) fn pem_block(pem: &[u8], labels: &[&str]) -> Option<Vec<u8>> {
    Pem::iter_from_buffer(pem)
        .filter_map(Result::ok)
        .find(|block| labels.contains(&block.label.as_str()))
        .map(|block| block.contents)
}

fn build_signed_info(reference_id: &str, digest_b64: &str) -> String {
    format!(
        r##"<ds:SignedInfo xmlns:ds="{ns}">
<ds:CanonicalizationMethod Algorithm="{c14n}"/>
<ds:SignatureMethod Algorithm="{sig}"/>
<ds:Reference URI="#{reference_id}">
<ds:Transforms>
<ds:Transform Algorithm="{enveloped}"/>
<ds:Transform Algorithm="{c14n}"/>
</ds:Transforms>
<ds:DigestMethod Algorithm="{digest}"/>
<ds:DigestValue>{digest_b64}</ds:DigestValue>
</ds:Reference>
</ds:SignedInfo>"##,
        ns = XMLDSIG_NS,
        c14n = canonicalization_algorithms::EXCLUSIVE_C14N,
        sig = signature_algorithms::RSA_SHA256,
        enveloped = canonicalization_algorithms::ENVELOPED_SIGNATURE,
        digest = digest_algorithms::SHA256,
    )
}

fn build_signature_element(signed_info: &str, signature_value: &str, certificate_der: &[u8]) -> String {
    format!(
        r#"<ds:Signature xmlns:ds="{XMLDSIG_NS}">
{signed_info}
<ds:SignatureValue>{signature_value}</ds:SignatureValue>
<ds:KeyInfo>
<ds:X509Data>
<ds:X509Certificate>{}</ds:X509Certificate>
</ds:X509Data>
</ds:KeyInfo>
</ds:Signature>"#,
        STANDARD.encode(certificate_der)
    )
}

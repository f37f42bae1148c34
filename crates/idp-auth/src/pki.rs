//! X.509 client certificate trust.
//!
//! TLS terminates in front of the IdP; the terminating proxy forwards the
//! verified-or-not client certificate in a request header. The certificate is
//! checked here against a bundle of issuing CA certificates:
//!
//! - the issuer name must equal a trust anchor's subject name
//! - the signature must verify under that anchor's RSA key
//! - the current time must fall inside the validity window
//!
//! Nothing here proves the caller holds the certificate's private key. The
//! proxy must drop the header from client requests, and the server only
//! honors it from configured proxy addresses when a list is set.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use idp_crypto::{rsa_verify, RsaAlgorithm};
use tracing::debug;
use x509_parser::pem::Pem;
use x509_parser::prelude::*;

use crate::error::{AuthError, AuthResult};

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

#[derive(Debug, Clone)]
struct TrustAnchor {
    subject_raw: Vec<u8>,
    subject: String,
    public_key: Vec<u8>,
}

/// Trusted issuers of client certificates.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchors {
    anchors: Vec<TrustAnchor>,
}

impl TrustAnchors {
    /// Loads anchors from a PEM bundle.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the bundle holds no parseable certificate.
    pub fn from_pem(pem: &[u8]) -> AuthResult<Self> {
        let mut anchors = Vec::new();

        for block in Pem::iter_from_buffer(pem) {
            let block = block.map_err(|e| AuthError::Configuration(format!("invalid PEM: {e}")))?;
            if block.label != "CERTIFICATE" {
                continue;
            }
            let cert = block
                .parse_x509()
                .map_err(|e| AuthError::Configuration(format!("invalid CA certificate: {e}")))?;
            anchors.push(TrustAnchor {
                subject_raw: cert.subject().as_raw().to_vec(),
                subject: cert.subject().to_string(),
                public_key: cert.public_key().subject_public_key.data.to_vec(),
            });
        }

        if anchors.is_empty() {
            return Err(AuthError::Configuration(
                "trust bundle contains no certificates".to_string(),
            ));
        }
        Ok(Self { anchors })
    }

    /// Loads anchors from a PEM file.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the file is unreadable or invalid.
    pub fn from_pem_file(path: impl AsRef<Path>) -> AuthResult<Self> {
        let path = path.as_ref();
        let pem = std::fs::read(path)
            .map_err(|e| AuthError::Configuration(format!("{}: {e}", path.display())))?;
        Self::from_pem(&pem)
    }

    /// Number of anchors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Returns true if no anchors are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Verifies a DER certificate and returns its subject identifier.
    ///
    /// The identifier is the first CN, or the full subject DN if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate is malformed, expired, or not
    /// issued by any anchor.
    pub fn verify(&self, der: &[u8]) -> AuthResult<String> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| AuthError::InvalidCertificate(e.to_string()))?;

        if !cert.validity().is_valid() {
            return Err(AuthError::CertificateExpired);
        }

        let issuer = cert.issuer().as_raw();
        let anchor = self
            .anchors
            .iter()
            .find(|anchor| anchor.subject_raw == issuer)
            .ok_or(AuthError::UntrustedCertificate)?;

        let oid = cert.signature_algorithm.algorithm.to_id_string();
        let algorithm = RsaAlgorithm::from_x509_oid(&oid).ok_or_else(|| {
            AuthError::InvalidCertificate(format!("unsupported signature algorithm {oid}"))
        })?;

        let valid = rsa_verify(
            &anchor.public_key,
            cert.tbs_certificate.as_ref(),
            &cert.signature_value.data,
            algorithm,
        )
        .map_err(|e| AuthError::InvalidCertificate(e.to_string()))?;
        if !valid {
            return Err(AuthError::UntrustedCertificate);
        }

        let subject = subject_identifier(&cert);
        debug!(subject = %subject, issuer = %anchor.subject, "Client certificate verified");
        Ok(subject)
    }

    /// Decodes a forwarded certificate header value and verifies it.
    ///
    /// # Errors
    ///
    /// See [`decode_certificate_header`] and [`TrustAnchors::verify`].
    pub fn verify_header(&self, value: &str) -> AuthResult<String> {
        let der = decode_certificate_header(value)?;
        self.verify(&der)
    }
}

fn subject_identifier(cert: &X509Certificate<'_>) -> String {
    cert.subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map_or_else(|| cert.subject().to_string(), String::from)
}

/// Decodes a client certificate forwarded in a header.
///
/// Accepts PEM, URL-encoded PEM (as nginx `$ssl_client_escaped_cert` sends it),
/// or bare base64 DER.
///
/// # Errors
///
/// Returns `AuthError::InvalidCertificate` if no DER can be recovered.
pub fn decode_certificate_header(value: &str) -> AuthResult<Vec<u8>> {
    let value = value.trim();

    let decoded = if value.contains('%') {
        urlencoding::decode(value)
            .map_or_else(|_| value.to_string(), std::borrow::Cow::into_owned)
    } else {
        value.to_string()
    };

    let body = match (decoded.find(PEM_BEGIN), decoded.find(PEM_END)) {
        (Some(start), Some(end)) if start < end => &decoded[start + PEM_BEGIN.len()..end],
        (Some(_), _) => {
            return Err(AuthError::InvalidCertificate(
                "PEM is missing its END marker".to_string(),
            ))
        }
        _ => decoded.as_str(),
    };

    let base64: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(base64)
        .map_err(|e| AuthError::InvalidCertificate(format!("base64: {e}")))
}

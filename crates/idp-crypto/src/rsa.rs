//! RSA PKCS#1 v1.5 signatures.
//!
//! XML-DSig in SAML deployments is almost always `rsa-sha256`, and client
//! certificates are issued with `sha256WithRSAEncryption`, so SHA-256 is
//! supported here alongside SHA-384 and SHA-512.

use aws_lc_rs::{
    rand::SystemRandom,
    signature::{self, KeyPair, RsaKeyPair, UnparsedPublicKey},
};

use crate::error::{CryptoError, CryptoResult};

/// RSA signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-256.
    Rs256,
    /// RSA PKCS#1 v1.5 with SHA-384.
    Rs384,
    /// RSA PKCS#1 v1.5 with SHA-512.
    Rs512,
}

impl RsaAlgorithm {
    /// Returns the XML-DSig algorithm URI.
    #[must_use]
    pub const fn xml_dsig_uri(self) -> &'static str {
        match self {
            Self::Rs256 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
            Self::Rs384 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384",
            Self::Rs512 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512",
        }
    }

    /// Maps an X.509 signature algorithm OID (dotted form) to an RSA algorithm.
    #[must_use]
    pub fn from_x509_oid(oid: &str) -> Option<Self> {
        match oid {
            "1.2.840.113549.1.1.11" => Some(Self::Rs256),
            "1.2.840.113549.1.1.12" => Some(Self::Rs384),
            "1.2.840.113549.1.1.13" => Some(Self::Rs512),
            _ => None,
        }
    }
}

fn load_key_pair(key_der: &[u8]) -> CryptoResult<RsaKeyPair> {
    RsaKeyPair::from_pkcs8(key_der)
        .or_else(|_| RsaKeyPair::from_der(key_der))
        .map_err(|e| CryptoError::InvalidKey(format!("invalid RSA key: {e}")))
}

/// Signs data with an RSA private key.
///
/// # Arguments
///
/// * `key_der` - RSA private key in DER format (PKCS#8 or PKCS#1)
/// * `data` - Data to sign
/// * `algorithm` - Signature algorithm
pub fn rsa_sign(key_der: &[u8], data: &[u8], algorithm: RsaAlgorithm) -> CryptoResult<Vec<u8>> {
    let key_pair = load_key_pair(key_der)?;

    let rng = SystemRandom::new();
    let mut signature = vec![0u8; key_pair.public_modulus_len()];

    let padding = match algorithm {
        RsaAlgorithm::Rs256 => &signature::RSA_PKCS1_SHA256,
        RsaAlgorithm::Rs384 => &signature::RSA_PKCS1_SHA384,
        RsaAlgorithm::Rs512 => &signature::RSA_PKCS1_SHA512,
    };

    key_pair
        .sign(padding, &rng, data, &mut signature)
        .map_err(|e| CryptoError::Signing(format!("RSA signing failed: {e}")))?;

    Ok(signature)
}

/// Returns the PKCS#1 `RSAPublicKey` DER for a private key.
///
/// Used to check that a configured certificate belongs to the signing key.
pub fn rsa_public_key_der(key_der: &[u8]) -> CryptoResult<Vec<u8>> {
    let key_pair = load_key_pair(key_der)?;
    Ok(key_pair.public_key().as_ref().to_vec())
}

/// Verifies an RSA signature.
///
/// # Arguments
///
/// * `public_key_der` - PKCS#1 `RSAPublicKey` DER (the `subjectPublicKey` bits of a certificate)
/// * `data` - Original data that was signed
/// * `sig` - Signature to verify
/// * `algorithm` - Signature algorithm
///
/// Returns `Ok(false)` for a well-formed but non-matching signature.
pub fn rsa_verify(
    public_key_der: &[u8],
    data: &[u8],
    sig: &[u8],
    algorithm: RsaAlgorithm,
) -> CryptoResult<bool> {
    let verification_alg: &dyn signature::VerificationAlgorithm = match algorithm {
        RsaAlgorithm::Rs256 => &signature::RSA_PKCS1_2048_8192_SHA256,
        RsaAlgorithm::Rs384 => &signature::RSA_PKCS1_2048_8192_SHA384,
        RsaAlgorithm::Rs512 => &signature::RSA_PKCS1_2048_8192_SHA512,
    };

    let public_key = UnparsedPublicKey::new(verification_alg, public_key_der);
    Ok(public_key.verify(data, sig).is_ok())
}

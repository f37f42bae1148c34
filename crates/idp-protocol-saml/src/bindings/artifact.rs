//! HTTP-Artifact binding.
//!
//! A type 0x0004 artifact is 44 bytes:
//!
//! | bytes  | field                                  |
//! |--------|----------------------------------------|
//! | 0..2   | type code `0x0004`                     |
//! | 2..4   | endpoint index                         |
//! | 4..24  | SourceID, SHA-1 of the IdP entity ID   |
//! | 24..44 | MessageHandle, 20 random bytes         |
//!
//! Handles are carried URL-safe base64 encoded without padding, so they can
//! sit in a query string unescaped.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use url::Url;

use crate::error::{SamlError, SamlResult};

/// Artifact type code.
pub const ARTIFACT_TYPE_CODE: [u8; 2] = [0x00, 0x04];

/// Length of a decoded artifact.
pub const ARTIFACT_LEN: usize = 44;

const SOURCE_ID_LEN: usize = 20;
const MESSAGE_HANDLE_LEN: usize = 20;

/// Query parameter carrying the artifact.
pub const ARTIFACT_PARAM: &str = "SAMLart";

/// Number of handle characters safe to log.
const LOG_PREFIX_LEN: usize = 8;

/// A decoded type 0x0004 artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Index of the resolution endpoint.
    pub endpoint_index: u16,
    /// SHA-1 of the issuing entity ID.
    pub source_id: [u8; SOURCE_ID_LEN],
    /// Random message handle.
    pub message_handle: [u8; MESSAGE_HANDLE_LEN],
}

impl Artifact {
    /// Mints a fresh artifact for `entity_id` with endpoint index 0.
    #[must_use]
    pub fn generate(entity_id: &str) -> Self {
        let mut source_id = [0u8; SOURCE_ID_LEN];
        source_id.copy_from_slice(&idp_crypto::sha1(entity_id.as_bytes()));
        let mut message_handle = [0u8; MESSAGE_HANDLE_LEN];
        message_handle.copy_from_slice(&idp_crypto::random_bytes(MESSAGE_HANDLE_LEN));

        Self {
            endpoint_index: 0,
            source_id,
            message_handle,
        }
    }

    /// Returns true if this artifact was issued by `entity_id`.
    #[must_use]
    pub fn is_from(&self, entity_id: &str) -> bool {
        idp_crypto::sha1(entity_id.as_bytes()) == self.source_id
    }

    /// Encodes the artifact for the wire.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut bytes = Vec::with_capacity(ARTIFACT_LEN);
        bytes.extend_from_slice(&ARTIFACT_TYPE_CODE);
        bytes.extend_from_slice(&self.endpoint_index.to_be_bytes());
        bytes.extend_from_slice(&self.source_id);
        bytes.extend_from_slice(&self.message_handle);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Decodes a wire artifact.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::MalformedRequest` for a wrong length or type code.
    pub fn decode(encoded: &str) -> SamlResult<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(encoded.trim())?;
        if bytes.len() != ARTIFACT_LEN {
            return Err(SamlError::MalformedRequest(format!(
                "artifact is {} bytes, expected {ARTIFACT_LEN}",
                bytes.len()
            )));
        }
        if bytes[..2] != ARTIFACT_TYPE_CODE {
            return Err(SamlError::MalformedRequest(
                "unsupported artifact type code".to_string(),
            ));
        }

        let mut source_id = [0u8; SOURCE_ID_LEN];
        source_id.copy_from_slice(&bytes[4..24]);
        let mut message_handle = [0u8; MESSAGE_HANDLE_LEN];
        message_handle.copy_from_slice(&bytes[24..ARTIFACT_LEN]);

        Ok(Self {
            endpoint_index: u16::from_be_bytes([bytes[2], bytes[3]]),
            source_id,
            message_handle,
        })
    }
}

/// Returns the loggable prefix of an encoded handle.
///
/// The first characters cover the type code and part of the SourceID, never
/// the random message handle.
#[must_use]
pub fn handle_prefix(handle: &str) -> &str {
    handle.get(..LOG_PREFIX_LEN).unwrap_or(handle)
}

/// HTTP-Artifact binding redirect construction.
pub struct HttpArtifactBinding;

impl HttpArtifactBinding {
    /// Builds the redirect to `acs_url` carrying the artifact and RelayState.
    ///
    /// Existing query parameters on the ACS URL are kept.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::MalformedRequest` if the ACS URL is not absolute.
    pub fn redirect_url(acs_url: &str, artifact: &str, relay_state: Option<&str>) -> SamlResult<String> {
        let mut url = Url::parse(acs_url)
            .map_err(|e| SamlError::MalformedRequest(format!("ACS URL {acs_url:?}: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(ARTIFACT_PARAM, artifact);
            if let Some(rs) = relay_state {
                query.append_pair("RelayState", rs);
            }
        }
        Ok(url.into())
    }

    /// Reads the artifact back out of a redirect URL, as a service provider would.
    #[must_use]
    pub fn artifact_from_url(location: &str) -> Option<String> {
        Url::parse(location)
            .ok()?
            .query_pairs()
            .find(|(key, _)| key == ARTIFACT_PARAM)
            .map(|(_, value)| value.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTITY_ID: &str = "https://idp.example.com";

    #[test]
    fn generated_artifact_has_fixed_layout() {
        let artifact = Artifact::generate(ENTITY_ID);
        let encoded = artifact.encode();

        // 44 bytes unpadded is 59 base64 characters
        assert_eq!(encoded.len(), 59);
        assert!(!encoded.contains(['+', '/', '=']));

        let decoded = Artifact::decode(&encoded).unwrap();
        assert_eq!(decoded, artifact);
        assert_eq!(decoded.endpoint_index, 0);
        assert!(decoded.is_from(ENTITY_ID));
        assert!(!decoded.is_from("https://other.example.com"));
    }

    #[test]
    fn handles_are_unique() {
        let a = Artifact::generate(ENTITY_ID).encode();
        let b = Artifact::generate(ENTITY_ID).encode();
        assert_ne!(a, b);
        // Same issuer, so the loggable prefix is shared
        assert_eq!(handle_prefix(&a), handle_prefix(&b));
    }

    #[test]
    fn wrong_length_or_type_is_malformed() {
        assert!(matches!(
            Artifact::decode("AAQAAA"),
            Err(SamlError::MalformedRequest(_))
        ));

        let mut bytes = vec![0x00, 0x01];
        bytes.resize(ARTIFACT_LEN, 0);
        assert!(matches!(
            Artifact::decode(&URL_SAFE_NO_PAD.encode(bytes)),
            Err(SamlError::MalformedRequest(_))
        ));
    }

    #[test]
    fn redirect_keeps_existing_query() {
        let location = HttpArtifactBinding::redirect_url(
            "https://sp.example.com/acs?tenant=a",
            "AAQAAAB",
            Some("back to /home"),
        )
        .unwrap();

        let url = Url::parse(&location).unwrap();
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("tenant".to_string(), "a".to_string()),
                ("SAMLart".to_string(), "AAQAAAB".to_string()),
                ("RelayState".to_string(), "back to /home".to_string()),
            ]
        );
        assert_eq!(
            HttpArtifactBinding::artifact_from_url(&location).as_deref(),
            Some("AAQAAAB")
        );
    }

    #[test]
    fn relative_acs_url_is_malformed() {
        assert!(HttpArtifactBinding::redirect_url("/acs", "x", None).is_err());
    }
}

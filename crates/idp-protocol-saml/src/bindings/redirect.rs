//! HTTP-Redirect binding.
//!
//! Inbound AuthnRequests arrive as `SAMLRequest` query parameters: raw
//! DEFLATE, then base64, then URL encoding.

use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::{SamlError, SamlResult};

/// Upper bound on an inflated message.
pub const MAX_INFLATED_LEN: u64 = 256 * 1024;

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Encodes a request into a redirect URL, as a service provider would.
    ///
    /// # Errors
    ///
    /// Returns an error if compression fails.
    pub fn encode_request(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<String> {
        let encoded = Self::encode_message(xml)?;
        let separator = if destination.contains('?') { '&' } else { '?' };

        let mut url = format!(
            "{destination}{separator}SAMLRequest={}",
            urlencoding::encode(&encoded)
        );
        if let Some(rs) = relay_state {
            url.push_str(&format!("&RelayState={}", urlencoding::encode(rs)));
        }
        Ok(url)
    }

    /// Deflates and base64-encodes a message, without URL encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if compression fails.
    pub fn encode_message(xml: &str) -> SamlResult<String> {
        let compressed = deflate_compress(xml.as_bytes())?;
        Ok(STANDARD.encode(compressed))
    }

    /// Decodes a `SAMLRequest` value into XML.
    ///
    /// Accepts the value whether or not the web framework already
    /// percent-decoded it. A `+` that arrived unencoded and was turned into a
    /// space is restored before base64 decoding.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::MalformedRequest` if any decoding step fails or
    /// the inflated message exceeds [`MAX_INFLATED_LEN`].
    pub fn decode_request(value: &str) -> SamlResult<String> {
        let url_decoded = if value.contains('%') {
            urlencoding::decode(value)
                .map_err(|e| SamlError::MalformedRequest(format!("URL decode: {e}")))?
                .into_owned()
        } else {
            value.to_string()
        };

        let b64: String = url_decoded
            .chars()
            .map(|c| if c == ' ' { '+' } else { c })
            .filter(|c| !c.is_whitespace())
            .collect();
        let compressed = STANDARD.decode(b64)?;

        let xml_bytes = deflate_decompress(&compressed)?;
        String::from_utf8(xml_bytes)
            .map_err(|e| SamlError::MalformedRequest(format!("invalid UTF-8 in message: {e}")))
    }
}

/// Compresses data using DEFLATE (raw, no zlib header).
fn deflate_compress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SamlError::Internal(format!("compression: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SamlError::Internal(format!("compression: {e}")))
}

/// Decompresses raw DEFLATE data, bounded by [`MAX_INFLATED_LEN`].
fn deflate_decompress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data).take(MAX_INFLATED_LEN + 1);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    if decompressed.len() as u64 > MAX_INFLATED_LEN {
        return Err(SamlError::MalformedRequest("message too large".to_string()));
    }
    Ok(decompressed)
}

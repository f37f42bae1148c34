//! Enveloped XML-DSig over SAML messages.
//!
//! Messages are signed with RSA-SHA256 over a SHA-256 digest of the
//! referenced element. Both the referenced element (after the enveloped
//! signature transform) and `SignedInfo` go through Exclusive XML
//! Canonicalization without comments, in [`XmlSigner`] and
//! [`XmlSignatureValidator`] alike. Signed documents are embedded and
//! transported byte-for-byte and are never re-serialized.

mod signer;
mod validator;

pub use signer::*;
pub use validator::*;

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use xml_canonicalization::Canonicalizer;

use crate::error::{SamlError, SamlResult};

/// A synchronous document signer.
///
/// Implementations may be CPU-heavy; [`SigningService`] moves every call off
/// the async runtime.
pub trait DocumentSigner: Send + Sync {
    /// Signs the element carrying `ID="reference_id"` and returns the full document.
    fn sign(&self, xml: &str, reference_id: &str) -> SamlResult<String>;

    /// Returns the DER certificate matching the signing key.
    fn certificate_der(&self) -> &[u8];
}

/// Deadline-bounded access to a [`DocumentSigner`].
///
/// A slow or failed signer fails only the request that called it, always as
/// [`SamlError::SigningError`].
#[derive(Clone)]
pub struct SigningService {
    signer: Arc<dyn DocumentSigner>,
    deadline: Duration,
}

impl SigningService {
    /// Wraps a signer with a per-call deadline.
    #[must_use]
    pub fn new(signer: Arc<dyn DocumentSigner>, deadline: Duration) -> Self {
        Self { signer, deadline }
    }

    /// Returns the signing certificate in DER form.
    #[must_use]
    pub fn certificate_der(&self) -> &[u8] {
        self.signer.certificate_der()
    }

    /// Signs `xml` on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::SigningError` if the signer fails, panics or misses
    /// the deadline. No partially signed document is ever returned.
    pub async fn sign(&self, xml: String, reference_id: &str) -> SamlResult<String> {
        let signer = Arc::clone(&self.signer);
        let id = reference_id.to_string();
        let task = tokio::task::spawn_blocking(move || signer.sign(&xml, &id));

        match tokio::time::timeout(self.deadline, task).await {
            Ok(Ok(Ok(signed))) => Ok(signed),
            Ok(Ok(Err(SamlError::SigningError(msg)))) => Err(SamlError::SigningError(msg)),
            Ok(Ok(Err(e))) => Err(SamlError::SigningError(e.to_string())),
            Ok(Err(e)) => Err(SamlError::SigningError(format!("signer task failed: {e}"))),
            Err(_) => {
                warn!(reference_id, deadline_ms = self.deadline.as_millis(), "Signer timed out");
                Err(SamlError::SigningError("signer timed out".to_string()))
            }
        }
    }
}

impl std::fmt::Debug for SigningService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningService")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

const SIGNATURE_OPEN: &str = "<ds:Signature";
const SIGNATURE_CLOSE: &str = "</ds:Signature>";

/// Byte offsets of an element within a document.
#[derive(Debug, Clone, Copy)]
struct ElementSpan {
    start: usize,
    open_end: usize,
    end: usize,
}

/// Finds the element carrying ` ID="id"`.
///
/// The close tag is matched on the full prefixed name. Elements never nest
/// inside an element of the same name in the messages this crate writes.
fn locate_element(xml: &str, id: &str) -> Option<ElementSpan> {
    let attr = xml.find(&format!(" ID=\"{id}\""))?;
    let start = xml[..attr].rfind('<')?;
    let name_len = xml[start + 1..].find(|c: char| c.is_whitespace() || c == '>' || c == '/')?;
    let name = &xml[start + 1..start + 1 + name_len];
    let open_end = attr + xml[attr..].find('>')? + 1;

    if xml[..open_end].ends_with("/>") {
        return Some(ElementSpan {
            start,
            open_end,
            end: open_end,
        });
    }

    let close = format!("</{name}>");
    let end = open_end + xml[open_end..].find(&close)? + close.len();
    Some(ElementSpan {
        start,
        open_end,
        end,
    })
}

/// Finds the first `ds:Signature` element in `xml`.
fn signature_range(xml: &str) -> Option<std::ops::Range<usize>> {
    let start = xml.find(SIGNATURE_OPEN)?;
    let end = start + xml[start..].find(SIGNATURE_CLOSE)? + SIGNATURE_CLOSE.len();
    Some(start..end)
}

/// Applies Exclusive XML Canonicalization, without comments.
///
/// # Errors
///
/// Returns `SamlError::Internal` if `xml` is not well-formed.
fn canonicalize(xml: &str) -> SamlResult<String> {
    let mut output = Vec::new();
    Canonicalizer::read_from_str(xml)
        .write_to_writer(&mut output)
        .canonicalize(false)
        .map_err(|e| SamlError::Internal(format!("XML canonicalization failed: {e}")))?;

    String::from_utf8(output)
        .map_err(|e| SamlError::Internal(format!("canonical XML is not UTF-8: {e}")))
}

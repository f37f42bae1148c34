//! HTTP-POST binding.
//!
//! The signed response is base64-encoded into a hidden form field of a
//! minimal page that submits itself to the service provider's ACS URL.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{SamlError, SamlResult};

/// HTTP-POST binding encoder/decoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Renders the auto-submitting form carrying `xml` as `SAMLResponse`.
    #[must_use]
    pub fn encode_response(xml: &str, destination: &str, relay_state: Option<&str>) -> String {
        let encoded = STANDARD.encode(xml);

        let relay_state_input = relay_state
            .map(|rs| {
                format!(
                    r#"<input type="hidden" name="RelayState" value="{}"/>"#,
                    html_escape(rs)
                )
            })
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Continue to service</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
        <input type="hidden" name="SAMLResponse" value="{}"/>
        {}
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            html_escape(destination),
            encoded,
            relay_state_input
        )
    }

    /// Decodes a `SAMLResponse` form value into XML, as a service provider would.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::MalformedRequest` if the value is not base64 UTF-8.
    pub fn decode_response(value: &str) -> SamlResult<String> {
        let decoded = STANDARD.decode(value.trim())?;
        String::from_utf8(decoded)
            .map_err(|e| SamlError::MalformedRequest(format!("invalid UTF-8 in message: {e}")))
    }

    /// Reads a hidden input's value back out of a rendered form.
    #[must_use]
    pub fn form_field(html: &str, name: &str) -> Option<String> {
        let marker = format!(r#"name="{name}" value=""#);
        let start = html.find(&marker)? + marker.len();
        let end = html[start..].find('"')?;
        Some(html_unescape(&html[start..start + end]))
    }

    /// Reads the form action back out of a rendered form.
    #[must_use]
    pub fn form_action(html: &str) -> Option<String> {
        let marker = r#"action=""#;
        let start = html.find(marker)? + marker.len();
        let end = html[start..].find('"')?;
        Some(html_unescape(&html[start..start + end]))
    }
}

/// Escapes HTML special characters.
#[must_use]
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn html_unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

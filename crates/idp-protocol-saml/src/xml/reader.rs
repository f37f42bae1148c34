//! Inbound message parsing.
//!
//! Messages are read into a small element tree with quick-xml, then mapped to
//! protocol types. Elements and attributes are matched by local name; the
//! namespace prefixes service providers pick vary too much to rely on.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use url::Url;

use crate::error::{SamlError, SamlResult};
use crate::types::{
    ArtifactResolve, ArtifactResponse, AttributeQuery, AuthnRequest, NameId, NameIdPolicy,
    SamlBinding, Status, SAML_VERSION,
};

/// A parsed XML element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Local name, without prefix.
    pub name: String,
    /// Attributes by local name, in document order.
    pub attributes: Vec<(String, String)>,
    /// Child elements.
    pub children: Vec<Element>,
    /// Concatenated text content.
    pub text: String,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> SamlResult<Self> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            ..Self::default()
        })
    }

    /// Returns an attribute value by local name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns a required attribute value.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::MalformedRequest` if it is absent.
    pub fn required_attr(&self, name: &str) -> SamlResult<&str> {
        self.attr(name).ok_or_else(|| {
            SamlError::MalformedRequest(format!("<{}> is missing {name}", self.name))
        })
    }

    /// Returns the first child with the given local name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Returns all children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Returns the trimmed text of a child, if present and non-empty.
    #[must_use]
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|child| child.text.trim())
            .filter(|text| !text.is_empty())
    }
}

/// Parses a document into its root element.
///
/// # Errors
///
/// Returns `SamlError::MalformedRequest` for ill-formed XML or a document
/// without a root element.
pub fn parse_document(xml: &str) -> SamlResult<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Element::from_start(&start)?),
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| SamlError::MalformedRequest("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(cdata) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&cdata));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(SamlError::MalformedRequest("unclosed element".to_string()));
    }
    root.ok_or_else(|| SamlError::MalformedRequest("empty document".to_string()))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// Returns the first element of a SOAP Body, or `root` if it is not an envelope.
///
/// # Errors
///
/// Returns `SamlError::MalformedRequest` if the envelope has an empty body.
pub fn soap_body(root: Element) -> SamlResult<Element> {
    if root.name != "Envelope" {
        return Ok(root);
    }
    root.children
        .into_iter()
        .find(|child| child.name == "Body")
        .and_then(|body| body.children.into_iter().next())
        .ok_or_else(|| SamlError::MalformedRequest("SOAP Body is empty".to_string()))
}

fn expect_name(element: &Element, name: &str) -> SamlResult<()> {
    if element.name == name {
        Ok(())
    } else {
        Err(SamlError::MalformedRequest(format!(
            "expected <{name}>, found <{}>",
            element.name
        )))
    }
}

fn check_version(element: &Element) -> SamlResult<String> {
    match element.attr("Version") {
        Some(SAML_VERSION) | None => Ok(SAML_VERSION.to_string()),
        Some(other) => Err(SamlError::MalformedRequest(format!(
            "unsupported SAML version {other}"
        ))),
    }
}

fn parse_instant(element: &Element) -> SamlResult<DateTime<Utc>> {
    let raw = element.required_attr("IssueInstant")?;
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|e| SamlError::MalformedRequest(format!("IssueInstant {raw:?}: {e}")))
}

fn parse_bool(element: &Element, name: &str) -> bool {
    matches!(element.attr(name), Some("true" | "1"))
}

fn parse_name_id(element: &Element) -> NameId {
    NameId {
        value: element.text.trim().to_string(),
        format: element.attr("Format").map(String::from),
    }
}

/// Accepts only absolute `http` or `https` URLs, so nothing else can become a
/// form action or redirect target.
fn parse_acs_url(raw: &str) -> SamlResult<String> {
    let url = Url::parse(raw)
        .map_err(|e| SamlError::MalformedRequest(format!("ACS URL {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(raw.to_string()),
        scheme => Err(SamlError::MalformedRequest(format!(
            "ACS URL {raw:?}: scheme {scheme} not allowed"
        ))),
    }
}

/// Maps an `<samlp:AuthnRequest>` element.
///
/// A missing `ProtocolBinding` means HTTP-POST. A binding URI this crate does
/// not know is reported as `UnsupportedBinding`.
///
/// # Errors
///
/// Returns `SamlError::MalformedRequest` if a required field is missing or
/// the ACS URL is not an absolute HTTP(S) URL.
pub fn authn_request(element: &Element) -> SamlResult<AuthnRequest> {
    expect_name(element, "AuthnRequest")?;

    let id = element.required_attr("ID")?.to_string();
    let version = check_version(element)?;
    let issue_instant = parse_instant(element)?;
    let issuer = element
        .child_text("Issuer")
        .ok_or_else(|| SamlError::MalformedRequest("AuthnRequest has no Issuer".to_string()))?
        .to_string();
    let acs_url = parse_acs_url(element.required_attr("AssertionConsumerServiceURL")?)?;

    let protocol_binding = match element.attr("ProtocolBinding") {
        None => SamlBinding::HttpPost,
        Some(uri) => SamlBinding::from_uri(uri)
            .ok_or_else(|| SamlError::UnsupportedBinding(uri.to_string()))?,
    };

    let name_id_policy = element.child("NameIDPolicy").map(|policy| NameIdPolicy {
        format: policy.attr("Format").map(String::from),
        allow_create: parse_bool(policy, "AllowCreate"),
    });

    Ok(AuthnRequest {
        id,
        version,
        issue_instant,
        issuer,
        assertion_consumer_service_url: acs_url,
        protocol_binding,
        destination: element.attr("Destination").map(String::from),
        name_id_policy,
        force_authn: parse_bool(element, "ForceAuthn"),
        is_passive: parse_bool(element, "IsPassive"),
        relay_state: None,
    })
}

/// Maps an `<samlp:ArtifactResolve>` element.
///
/// # Errors
///
/// Returns `SamlError::MalformedRequest` if a required field is missing.
pub fn artifact_resolve(element: &Element) -> SamlResult<ArtifactResolve> {
    expect_name(element, "ArtifactResolve")?;

    let artifact = element
        .child_text("Artifact")
        .ok_or_else(|| SamlError::MalformedRequest("ArtifactResolve has no Artifact".to_string()))?
        .to_string();

    Ok(ArtifactResolve {
        id: element.required_attr("ID")?.to_string(),
        version: check_version(element)?,
        issue_instant: parse_instant(element)?,
        issuer: element.child_text("Issuer").map(String::from),
        artifact,
    })
}

/// Maps an `<samlp:AttributeQuery>` element.
///
/// # Errors
///
/// Returns `SamlError::MalformedRequest` if a required field is missing.
pub fn attribute_query(element: &Element) -> SamlResult<AttributeQuery> {
    expect_name(element, "AttributeQuery")?;

    let subject = element
        .child("Subject")
        .and_then(|subject| subject.child("NameID"))
        .map(parse_name_id)
        .filter(|name_id| !name_id.value.is_empty())
        .ok_or_else(|| SamlError::MalformedRequest("AttributeQuery has no Subject NameID".to_string()))?;

    let requested = element
        .children_named("Attribute")
        .map(|attr| attr.required_attr("Name").map(String::from))
        .collect::<SamlResult<Vec<_>>>()?;

    Ok(AttributeQuery {
        id: element.required_attr("ID")?.to_string(),
        version: check_version(element)?,
        issue_instant: parse_instant(element)?,
        issuer: element.child_text("Issuer").map(String::from),
        subject,
        requested,
    })
}

fn parse_status(element: &Element) -> SamlResult<Status> {
    let status = element
        .child("Status")
        .ok_or_else(|| SamlError::MalformedRequest("message has no Status".to_string()))?;
    let code = status
        .child("StatusCode")
        .ok_or_else(|| SamlError::MalformedRequest("Status has no StatusCode".to_string()))?;

    Ok(Status {
        code: code.required_attr("Value")?.to_string(),
        sub_code: code
            .child("StatusCode")
            .and_then(|sub| sub.attr("Value"))
            .map(String::from),
        message: status.child_text("StatusMessage").map(String::from),
    })
}

/// Summary of a `<samlp:Response>` as a service provider reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSummary {
    /// Response ID.
    pub id: String,
    /// ID of the answered request.
    pub in_response_to: Option<String>,
    /// Issuer entity ID.
    pub issuer: Option<String>,
    /// Destination URL.
    pub destination: Option<String>,
    /// Status.
    pub status: Status,
    /// Assertion subject, if an assertion is present.
    pub subject: Option<NameId>,
    /// Audience of the assertion.
    pub audience: Option<String>,
    /// Authentication context class URI.
    pub authn_context: Option<String>,
    /// Attribute names with their values.
    pub attributes: Vec<(String, Vec<String>)>,
}

/// Reads a `<samlp:Response>` element.
///
/// # Errors
///
/// Returns `SamlError::MalformedRequest` if a required field is missing.
pub fn response_summary(element: &Element) -> SamlResult<ResponseSummary> {
    expect_name(element, "Response")?;
    let assertion = element.child("Assertion");

    let attributes = assertion
        .and_then(|a| a.child("AttributeStatement"))
        .map(|statement| {
            statement
                .children_named("Attribute")
                .map(|attr| {
                    let values = attr
                        .children_named("AttributeValue")
                        .map(|value| value.text.clone())
                        .collect();
                    (attr.attr("Name").unwrap_or_default().to_string(), values)
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ResponseSummary {
        id: element.required_attr("ID")?.to_string(),
        in_response_to: element.attr("InResponseTo").map(String::from),
        issuer: element.child_text("Issuer").map(String::from),
        destination: element.attr("Destination").map(String::from),
        status: parse_status(element)?,
        subject: assertion
            .and_then(|a| a.child("Subject"))
            .and_then(|s| s.child("NameID"))
            .map(parse_name_id),
        audience: assertion
            .and_then(|a| a.child("Conditions"))
            .and_then(|c| c.child("AudienceRestriction"))
            .and_then(|r| r.child_text("Audience"))
            .map(String::from),
        authn_context: assertion
            .and_then(|a| a.child("AuthnStatement"))
            .and_then(|s| s.child("AuthnContext"))
            .and_then(|c| c.child_text("AuthnContextClassRef"))
            .map(String::from),
        attributes,
    })
}

/// Reads a `<samlp:ArtifactResponse>` element.
///
/// The embedded message is not re-serialized; `message` only reports its ID.
///
/// # Errors
///
/// Returns `SamlError::MalformedRequest` if a required field is missing.
pub fn artifact_response(element: &Element) -> SamlResult<(ArtifactResponse, Option<ResponseSummary>)> {
    expect_name(element, "ArtifactResponse")?;

    let embedded = element
        .child("Response")
        .map(response_summary)
        .transpose()?;

    let response = ArtifactResponse {
        id: element.required_attr("ID")?.to_string(),
        version: check_version(element)?,
        issue_instant: parse_instant(element)?,
        issuer: element.child_text("Issuer").unwrap_or_default().to_string(),
        in_response_to: element.required_attr("InResponseTo")?.to_string(),
        status: parse_status(element)?,
        message: embedded.as_ref().map(|summary| summary.id.clone()),
    };
    Ok((response, embedded))
}

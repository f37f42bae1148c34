//! Outbound message serialization.
//!
//! Messages are written compactly, without insignificant whitespace, so the
//! bytes that are signed are the bytes that go on the wire. Each root element
//! declares the namespaces it uses, which keeps a signed response valid when
//! it is embedded in an ArtifactResponse.

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;

use crate::attributes::AttributeSet;
use crate::types::{
    ArtifactResolve, ArtifactResponse, Assertion, AttributeQuery, AuthnRequest, NameId, Response,
    Status, ATTRNAME_FORMAT_BASIC, CM_BEARER, SAMLP_NS, SAML_NS, SOAP_ENV_NS, XSI_NS, XS_NS,
};

/// Formats an instant as `xs:dateTime` in UTC with second precision.
#[must_use]
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape(value));
    out.push('"');
}

fn opt_attr(out: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        attr(out, name, value);
    }
}

fn text_element(out: &mut String, tag: &str, text: &str) {
    out.push_str(&format!("<{tag}>{}</{tag}>", escape(text)));
}

fn protocol_open(out: &mut String, tag: &str, id: &str, version: &str, instant: DateTime<Utc>) {
    out.push_str(&format!(
        r#"<samlp:{tag} xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}""#
    ));
    attr(out, "ID", id);
    attr(out, "Version", version);
    attr(out, "IssueInstant", &format_instant(instant));
}

fn write_issuer(out: &mut String, issuer: &str) {
    text_element(out, "saml:Issuer", issuer);
}

fn write_status(out: &mut String, status: &Status) {
    out.push_str("<samlp:Status><samlp:StatusCode");
    attr(out, "Value", &status.code);
    match status.sub_code.as_deref() {
        Some(sub) => {
            out.push_str("><samlp:StatusCode");
            attr(out, "Value", sub);
            out.push_str("/></samlp:StatusCode>");
        }
        None => out.push_str("/>"),
    }
    if let Some(message) = status.message.as_deref() {
        text_element(out, "samlp:StatusMessage", message);
    }
    out.push_str("</samlp:Status>");
}

fn write_name_id(out: &mut String, name_id: &NameId) {
    out.push_str("<saml:NameID");
    opt_attr(out, "Format", name_id.format.as_deref());
    out.push('>');
    out.push_str(&escape(&name_id.value));
    out.push_str("</saml:NameID>");
}

fn write_attributes(out: &mut String, attributes: &AttributeSet) {
    if attributes.is_empty() {
        return;
    }
    out.push_str("<saml:AttributeStatement>");
    for (name, values) in attributes.iter() {
        out.push_str("<saml:Attribute");
        attr(out, "Name", name);
        attr(out, "NameFormat", ATTRNAME_FORMAT_BASIC);
        out.push('>');
        for value in values {
            out.push_str(&format!(
                r#"<saml:AttributeValue xmlns:xs="{XS_NS}" xmlns:xsi="{XSI_NS}" xsi:type="xs:string">{}</saml:AttributeValue>"#,
                escape(value)
            ));
        }
        out.push_str("</saml:Attribute>");
    }
    out.push_str("</saml:AttributeStatement>");
}

/// Serializes an assertion.
#[must_use]
pub fn write_assertion(assertion: &Assertion) -> String {
    let mut out = format!(r#"<saml:Assertion xmlns:saml="{SAML_NS}""#);
    attr(&mut out, "ID", &assertion.id);
    attr(&mut out, "Version", &assertion.version);
    attr(&mut out, "IssueInstant", &format_instant(assertion.issue_instant));
    out.push('>');
    write_issuer(&mut out, &assertion.issuer);

    out.push_str("<saml:Subject>");
    write_name_id(&mut out, &assertion.subject.name_id);
    if let Some(data) = &assertion.subject.confirmation {
        out.push_str("<saml:SubjectConfirmation");
        attr(&mut out, "Method", CM_BEARER);
        out.push_str("><saml:SubjectConfirmationData");
        attr(&mut out, "InResponseTo", &data.in_response_to);
        attr(&mut out, "NotOnOrAfter", &format_instant(data.not_on_or_after));
        attr(&mut out, "Recipient", &data.recipient);
        out.push_str("/></saml:SubjectConfirmation>");
    }
    out.push_str("</saml:Subject>");

    let conditions = &assertion.conditions;
    out.push_str("<saml:Conditions");
    attr(&mut out, "NotBefore", &format_instant(conditions.not_before));
    attr(&mut out, "NotOnOrAfter", &format_instant(conditions.not_on_or_after));
    match conditions.audience.as_deref() {
        Some(audience) => {
            out.push_str("><saml:AudienceRestriction>");
            text_element(&mut out, "saml:Audience", audience);
            out.push_str("</saml:AudienceRestriction></saml:Conditions>");
        }
        None => out.push_str("/>"),
    }

    if let Some(statement) = &assertion.authn_statement {
        out.push_str("<saml:AuthnStatement");
        attr(&mut out, "AuthnInstant", &format_instant(statement.authn_instant));
        opt_attr(&mut out, "SessionIndex", statement.session_index.as_deref());
        out.push_str("><saml:AuthnContext>");
        text_element(&mut out, "saml:AuthnContextClassRef", statement.context_class.uri());
        out.push_str("</saml:AuthnContext></saml:AuthnStatement>");
    }

    write_attributes(&mut out, &assertion.attributes);
    out.push_str("</saml:Assertion>");
    out
}

/// Serializes a response, including its assertion.
#[must_use]
pub fn write_response(response: &Response) -> String {
    let mut out = String::new();
    protocol_open(&mut out, "Response", &response.id, &response.version, response.issue_instant);
    opt_attr(&mut out, "Destination", response.destination.as_deref());
    opt_attr(&mut out, "InResponseTo", response.in_response_to.as_deref());
    out.push('>');
    write_issuer(&mut out, &response.issuer);
    write_status(&mut out, &response.status);
    if let Some(assertion) = &response.assertion {
        out.push_str(&write_assertion(assertion));
    }
    out.push_str("</samlp:Response>");
    out
}

/// Serializes an ArtifactResponse, embedding its message verbatim.
#[must_use]
pub fn write_artifact_response(response: &ArtifactResponse) -> String {
    let mut out = String::new();
    protocol_open(
        &mut out,
        "ArtifactResponse",
        &response.id,
        &response.version,
        response.issue_instant,
    );
    attr(&mut out, "InResponseTo", &response.in_response_to);
    out.push('>');
    write_issuer(&mut out, &response.issuer);
    write_status(&mut out, &response.status);
    if let Some(message) = response.message.as_deref() {
        out.push_str(message);
    }
    out.push_str("</samlp:ArtifactResponse>");
    out
}

/// Serializes an AuthnRequest.
#[must_use]
pub fn write_authn_request(request: &AuthnRequest) -> String {
    let mut out = String::new();
    protocol_open(&mut out, "AuthnRequest", &request.id, &request.version, request.issue_instant);
    opt_attr(&mut out, "Destination", request.destination.as_deref());
    attr(
        &mut out,
        "AssertionConsumerServiceURL",
        &request.assertion_consumer_service_url,
    );
    attr(&mut out, "ProtocolBinding", request.protocol_binding.uri());
    if request.force_authn {
        attr(&mut out, "ForceAuthn", "true");
    }
    if request.is_passive {
        attr(&mut out, "IsPassive", "true");
    }
    out.push('>');
    write_issuer(&mut out, &request.issuer);
    if let Some(policy) = &request.name_id_policy {
        out.push_str("<samlp:NameIDPolicy");
        opt_attr(&mut out, "Format", policy.format.as_deref());
        if policy.allow_create {
            attr(&mut out, "AllowCreate", "true");
        }
        out.push_str("/>");
    }
    out.push_str("</samlp:AuthnRequest>");
    out
}

/// Serializes an ArtifactResolve.
#[must_use]
pub fn write_artifact_resolve(resolve: &ArtifactResolve) -> String {
    let mut out = String::new();
    protocol_open(&mut out, "ArtifactResolve", &resolve.id, &resolve.version, resolve.issue_instant);
    out.push('>');
    if let Some(issuer) = resolve.issuer.as_deref() {
        write_issuer(&mut out, issuer);
    }
    text_element(&mut out, "samlp:Artifact", &resolve.artifact);
    out.push_str("</samlp:ArtifactResolve>");
    out
}

/// Serializes an AttributeQuery.
#[must_use]
pub fn write_attribute_query(query: &AttributeQuery) -> String {
    let mut out = String::new();
    protocol_open(&mut out, "AttributeQuery", &query.id, &query.version, query.issue_instant);
    out.push('>');
    if let Some(issuer) = query.issuer.as_deref() {
        write_issuer(&mut out, issuer);
    }
    out.push_str("<saml:Subject>");
    write_name_id(&mut out, &query.subject);
    out.push_str("</saml:Subject>");
    for name in &query.requested {
        out.push_str("<saml:Attribute");
        attr(&mut out, "Name", name);
        out.push_str("/>");
    }
    out.push_str("</samlp:AttributeQuery>");
    out
}

/// Wraps a message in a SOAP 1.1 envelope.
#[must_use]
pub fn soap_envelope(body: &str) -> String {
    format!(
        r#"<soap11:Envelope xmlns:soap11="{SOAP_ENV_NS}"><soap11:Body>{body}</soap11:Body></soap11:Envelope>"#
    )
}

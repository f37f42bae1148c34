//! SSO session cookie.
//!
//! The cookie carries only the opaque session token; the principal lives in
//! the store. `HttpOnly` and `SameSite=Lax`, so the token survives the
//! top-level redirect from a service provider.

use std::time::Duration;

use axum::http::{header::COOKIE, header::SET_COOKIE, HeaderMap, HeaderValue};

/// Session cookie settings.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    name: String,
    max_age: Duration,
    secure: bool,
}

impl SessionCookie {
    /// Creates settings for a cookie called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, max_age: Duration, secure: bool) -> Self {
        Self {
            name: name.into(),
            max_age,
            secure,
        }
    }

    /// Returns the `Set-Cookie` value for `token`.
    #[must_use]
    pub fn create(&self, token: &str) -> String {
        let secure_flag = if self.secure { "; Secure" } else { "" };
        format!(
            "{}={token}; HttpOnly{secure_flag}; SameSite=Lax; Path=/; Max-Age={}",
            self.name,
            self.max_age.as_secs()
        )
    }

    /// Adds a `Set-Cookie` header for `token`.
    pub fn set(&self, headers: &mut HeaderMap, token: &str) {
        match HeaderValue::from_str(&self.create(token)) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "Session token is not a valid cookie value"),
        }
    }

    /// Extracts the session token from request cookies.
    #[must_use]
    pub fn extract(&self, headers: &HeaderMap) -> Option<String> {
        let prefix = format!("{}=", self.name);
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .find_map(|part| part.trim().strip_prefix(&prefix).map(str::trim))
            .filter(|token| !token.is_empty())
            .map(String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(secure: bool) -> SessionCookie {
        SessionCookie::new("idp_session", Duration::from_secs(28_800), secure)
    }

    #[test]
    fn create_sets_flags() {
        assert_eq!(
            cookie(false).create("abc"),
            "idp_session=abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=28800"
        );
        assert!(cookie(true).create("abc").contains("; Secure;"));
    }

    #[test]
    fn extract_finds_token_among_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; idp_session=tok123; x=1"));
        assert_eq!(cookie(false).extract(&headers).as_deref(), Some("tok123"));
    }

    #[test]
    fn extract_ignores_missing_or_empty() {
        let mut headers = HeaderMap::new();
        assert!(cookie(false).extract(&headers).is_none());

        headers.insert(COOKIE, HeaderValue::from_static("idp_session="));
        assert!(cookie(false).extract(&headers).is_none());

        headers.insert(COOKIE, HeaderValue::from_static("other_idp_session=x"));
        assert!(cookie(false).extract(&headers).is_none());
    }

    #[test]
    fn set_round_trips_through_headers() {
        let mut response = HeaderMap::new();
        cookie(false).set(&mut response, "tok");
        let value = response.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(value.starts_with("idp_session=tok;"));
    }
}

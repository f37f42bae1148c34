//! Authenticated principal.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a principal proved its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// X.509 client certificate.
    Pki,
    /// Username and password.
    Password,
}

impl AuthMethod {
    /// Returns the configuration name of this method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pki => "pki",
            Self::Password => "password",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pki" => Ok(Self::Pki),
            "password" => Ok(Self::Password),
            other => Err(format!("unknown authenticator '{other}'")),
        }
    }
}

/// An authenticated subject.
///
/// Stored as JSON under a session token for SSO reuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Subject identifier, used as the assertion NameID.
    pub subject: String,
    /// Method that authenticated the subject.
    pub method: AuthMethod,
    /// When authentication happened.
    pub authn_instant: DateTime<Utc>,
}

impl Principal {
    /// Creates a principal authenticated now.
    #[must_use]
    pub fn new(subject: impl Into<String>, method: AuthMethod) -> Self {
        Self {
            subject: subject.into(),
            method,
            authn_instant: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("PKI".parse::<AuthMethod>(), Ok(AuthMethod::Pki));
        assert_eq!(" password ".parse::<AuthMethod>(), Ok(AuthMethod::Password));
        assert!("otp".parse::<AuthMethod>().is_err());
    }

    #[test]
    fn principal_serializes_method_lowercase() {
        let principal = Principal::new("alice", AuthMethod::Pki);
        let json = serde_json::to_string(&principal).unwrap();
        assert!(json.contains("\"method\":\"pki\""));

        let back: Principal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, principal);
    }
}

//! Server configuration.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use idp_auth::AuthMethod;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host to bind to.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Base URL for the server (used in generated URLs).
    pub base_url: String,

    /// SAML entity ID of this IdP.
    pub entity_id: String,

    /// PEM private key used for signing.
    pub signing_key: Option<PathBuf>,

    /// PEM certificate matching the signing key.
    pub signing_cert: Option<PathBuf>,

    /// Authenticator links, in evaluation order.
    pub authenticators: Vec<AuthMethod>,

    /// PEM bundle of trusted client certificate issuers.
    pub trusted_ca: Option<PathBuf>,

    /// Header carrying a forwarded client certificate.
    ///
    /// Nothing proves the sender holds the certificate's key. The
    /// TLS-terminating front end must drop this header from client requests
    /// and set it only from the verified handshake.
    pub client_cert_header: String,

    /// Proxy addresses allowed to set `client_cert_header`. Empty trusts
    /// every peer, which is only safe when the IdP is unreachable except
    /// through the front end.
    pub trusted_proxies: Vec<IpAddr>,

    /// JSON map of username to Argon2id hash.
    pub credentials_file: Option<PathBuf>,

    /// JSON attribute store.
    pub attributes_file: Option<PathBuf>,

    /// Redis URL. The in-memory store is used without it.
    pub redis_url: Option<String>,

    /// Artifact lifetime in seconds.
    pub artifact_ttl_secs: u64,

    /// SSO session lifetime in seconds.
    pub session_ttl_secs: u64,

    /// Assertion validity in seconds.
    pub assertion_validity_secs: u64,

    /// Deadline for each store, signer and attribute call, in milliseconds.
    pub request_timeout_ms: u64,

    /// Redirect-binding SSO endpoint.
    pub sso_path: String,

    /// Login form action.
    pub login_path: String,

    /// Artifact resolution endpoint.
    pub artifact_path: String,

    /// Attribute query endpoint.
    pub attribute_query_path: String,

    /// SSO session cookie name.
    pub session_cookie: String,

    /// Whether cookies carry the `Secure` flag.
    pub secure_cookies: bool,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// Parses a comma-separated authenticator list such as `pki,password`.
pub fn parse_authenticators(value: &str) -> anyhow::Result<Vec<AuthMethod>> {
    let methods = value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<AuthMethod>().map_err(anyhow::Error::msg))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if methods.is_empty() {
        anyhow::bail!("IDP_AUTHENTICATORS names no authenticator");
    }
    Ok(methods)
}

/// Parses a comma-separated address list such as `10.0.0.1,::1`.
pub fn parse_trusted_proxies(value: &str) -> anyhow::Result<Vec<IpAddr>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpAddr>()
                .with_context(|| format!("IDP_TRUSTED_PROXIES: invalid address {s:?}"))
        })
        .collect()
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let host = env_or("IDP_HOST", &defaults.host);
        let port = env_parsed("IDP_PORT", defaults.port);
        let base_url = std::env::var("IDP_BASE_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}"));
        let entity_id = std::env::var("IDP_ENTITY_ID").unwrap_or_else(|_| base_url.clone());

        let signing_key = env_path("IDP_SIGNING_KEY")
            .context("IDP_SIGNING_KEY environment variable is required")?;
        let signing_cert = env_path("IDP_SIGNING_CERT")
            .context("IDP_SIGNING_CERT environment variable is required")?;

        let authenticators = parse_authenticators(&env_or("IDP_AUTHENTICATORS", "pki,password"))?;
        let trusted_ca = env_path("IDP_TRUSTED_CA");
        let credentials_file = env_path("IDP_CREDENTIALS_FILE");
        let trusted_proxies = parse_trusted_proxies(&env_or("IDP_TRUSTED_PROXIES", ""))?;

        if authenticators.contains(&AuthMethod::Pki) && trusted_ca.is_none() {
            anyhow::bail!("IDP_TRUSTED_CA is required when the pki authenticator is configured");
        }
        if authenticators.contains(&AuthMethod::Password) && credentials_file.is_none() {
            anyhow::bail!(
                "IDP_CREDENTIALS_FILE is required when the password authenticator is configured"
            );
        }

        let secure_cookies = std::env::var("IDP_SECURE_COOKIES")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true);

        Ok(Self {
            host,
            port,
            base_url,
            entity_id,
            signing_key: Some(signing_key),
            signing_cert: Some(signing_cert),
            authenticators,
            trusted_ca,
            client_cert_header: env_or("IDP_CLIENT_CERT_HEADER", &defaults.client_cert_header),
            trusted_proxies,
            credentials_file,
            attributes_file: env_path("IDP_ATTRIBUTES_FILE"),
            redis_url: std::env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            artifact_ttl_secs: env_parsed("IDP_ARTIFACT_TTL_SECS", defaults.artifact_ttl_secs),
            session_ttl_secs: env_parsed("IDP_SESSION_TTL_SECS", defaults.session_ttl_secs),
            assertion_validity_secs: env_parsed(
                "IDP_ASSERTION_VALIDITY_SECS",
                defaults.assertion_validity_secs,
            ),
            request_timeout_ms: env_parsed("IDP_REQUEST_TIMEOUT_MS", defaults.request_timeout_ms),
            sso_path: env_or("IDP_SSO_PATH", &defaults.sso_path),
            login_path: env_or("IDP_LOGIN_PATH", &defaults.login_path),
            artifact_path: env_or("IDP_ARTIFACT_PATH", &defaults.artifact_path),
            attribute_query_path: env_or("IDP_ATTRIBUTE_QUERY_PATH", &defaults.attribute_query_path),
            session_cookie: env_or("IDP_SESSION_COOKIE", &defaults.session_cookie),
            secure_cookies,
        })
    }

    /// Creates a configuration for testing.
    ///
    /// No key material or backend paths are set; tests inject them.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
            base_url: "http://localhost:8080".to_string(),
            entity_id: "https://idp.example.com".to_string(),
            secure_cookies: false,
            ..Self::default()
        }
    }

    /// Returns the artifact lifetime.
    #[must_use]
    pub const fn artifact_ttl(&self) -> Duration {
        Duration::from_secs(self.artifact_ttl_secs)
    }

    /// Returns the SSO session lifetime.
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Returns the assertion validity.
    #[must_use]
    pub const fn assertion_validity(&self) -> Duration {
        Duration::from_secs(self.assertion_validity_secs)
    }

    /// Returns the per-call deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            base_url: "http://localhost:8080".to_string(),
            entity_id: "http://localhost:8080".to_string(),
            signing_key: None,
            signing_cert: None,
            authenticators: vec![AuthMethod::Pki, AuthMethod::Password],
            trusted_ca: None,
            client_cert_header: "X-Client-Cert".to_string(),
            trusted_proxies: Vec::new(),
            credentials_file: None,
            attributes_file: None,
            redis_url: None,
            artifact_ttl_secs: 60,
            session_ttl_secs: 28_800, // 8 hours
            assertion_validity_secs: 300,
            request_timeout_ms: 2_000,
            sso_path: "/SAML2/Redirect/SSO".to_string(),
            login_path: "/login".to_string(),
            artifact_path: "/SAML2/SOAP/ArtifactResolution".to_string(),
            attribute_query_path: "/SAML2/SOAP/AttributeQuery".to_string(),
            session_cookie: "idp_session".to_string(),
            secure_cookies: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticator_list_keeps_order() {
        assert_eq!(
            parse_authenticators("password, pki").unwrap(),
            vec![AuthMethod::Password, AuthMethod::Pki]
        );
    }

    #[test]
    fn authenticator_list_rejects_unknown_and_empty() {
        assert!(parse_authenticators("pki,kerberos").is_err());
        assert!(parse_authenticators(" , ").is_err());
    }

    #[test]
    fn trusted_proxy_list_parses_both_families() {
        assert_eq!(
            parse_trusted_proxies("10.0.0.1, ::1").unwrap(),
            vec![IpAddr::from([10, 0, 0, 1]), "::1".parse::<IpAddr>().unwrap()]
        );
        assert!(parse_trusted_proxies("").unwrap().is_empty());
        assert!(parse_trusted_proxies("10.0.0.1,proxy.internal").is_err());
    }

    #[test]
    fn environment_supplies_proxy_list() {
        std::env::set_var("IDP_SIGNING_KEY", "/etc/idp/signing.key");
        std::env::set_var("IDP_SIGNING_CERT", "/etc/idp/signing.crt");
        std::env::set_var("IDP_AUTHENTICATORS", "pki");
        std::env::set_var("IDP_TRUSTED_CA", "/etc/idp/ca.pem");
        std::env::set_var("IDP_TRUSTED_PROXIES", "10.0.0.1,10.0.0.2");

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(
            config.trusted_proxies,
            vec![IpAddr::from([10, 0, 0, 1]), IpAddr::from([10, 0, 0, 2])]
        );

        std::env::set_var("IDP_TRUSTED_PROXIES", "10.0.0.1;10.0.0.2");
        assert!(ServerConfig::from_env().is_err());
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.artifact_ttl(), Duration::from_secs(60));
        assert_eq!(config.session_ttl(), Duration::from_secs(8 * 3600));
        assert_eq!(config.assertion_validity(), Duration::from_secs(300));
        assert_eq!(config.request_timeout(), Duration::from_millis(2000));
        assert!(config.secure_cookies);
        assert!(config.trusted_proxies.is_empty());
    }

    #[test]
    fn testing_config_has_no_paths() {
        let config = ServerConfig::for_testing();
        assert!(config.signing_key.is_none());
        assert!(config.credentials_file.is_none());
        assert!(!config.secure_cookies);
    }
}

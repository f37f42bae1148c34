//! Application state management.
//!
//! This module defines the shared state that is passed to all request handlers.

use std::sync::Arc;

use idp_protocol_saml::endpoints::IdpState;

use crate::config::ServerConfig;
use crate::cookie::SessionCookie;

/// Application state shared across all request handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// SAML protocol state.
    pub idp: IdpState,

    /// SSO session cookie settings.
    pub session_cookie: SessionCookie,
}

impl AppState {
    /// Creates a new application state.
    #[must_use]
    pub fn new(config: ServerConfig, idp: IdpState) -> Self {
        let session_cookie = SessionCookie::new(
            &config.session_cookie,
            config.session_ttl(),
            config.secure_cookies,
        );
        Self {
            config: Arc::new(config),
            idp,
            session_cookie,
        }
    }

    /// Returns the SAML protocol state.
    #[must_use]
    pub const fn idp(&self) -> &IdpState {
        &self.idp
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

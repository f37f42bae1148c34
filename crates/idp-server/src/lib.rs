//! # idp-server
//!
//! Axum server for the lite-idp SAML identity provider.
//!
//! This crate wires the protocol engine to HTTP:
//! - Redirect-binding SSO endpoint and login form
//! - SOAP artifact resolution and attribute query endpoints
//! - Health check endpoints
//!
//! ## Architecture
//!
//! Backends (store, credentials, trust anchors, signing key, attributes) are
//! chosen from [`ServerConfig`] at startup and injected into an
//! [`IdpState`](idp_protocol_saml::endpoints::IdpState).
//!
//! ## Usage
//!
//! ```ignore
//! use idp_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::from_env()?;
//! let server = Server::new(config).await?;
//! server.run().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod cookie;
pub mod providers;
pub mod router;
pub mod saml_handlers;
pub mod state;
pub mod ui;

pub use config::ServerConfig;
pub use router::create_router;
pub use state::AppState;

use std::net::SocketAddr;

use axum::Router;
use idp_protocol_saml::endpoints::IdpState;
use tokio::net::TcpListener;

/// The identity provider server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Creates a new server instance.
    ///
    /// Loads key material, credentials and trust anchors and connects the store.
    pub async fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let idp = providers::build_idp_state(&config).await?;
        Ok(Self::with_state(config, idp))
    }

    /// Creates a server around an already-built protocol state.
    #[must_use]
    pub fn with_state(config: ServerConfig, idp: IdpState) -> Self {
        Self {
            state: AppState::new(config, idp),
        }
    }

    /// Runs the server.
    ///
    /// This starts the HTTP server and blocks until it receives a shutdown signal.
    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.state.config.clone();
        let app = create_router(self.state);

        let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!(
            entity_id = %config.entity_id,
            sso = %config.sso_path,
            "Server listening on http://{}",
            listener.local_addr()?
        );

        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        self.state.config()
    }

    /// Creates a test router without starting the server.
    ///
    /// This is useful for integration testing.
    #[must_use]
    pub fn test_router(&self) -> Router {
        create_router(self.state.clone())
    }
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

//! Backend wiring.
//!
//! Builds the store, authenticator chain, signer and attribute retriever
//! named by a [`ServerConfig`] and assembles them into an [`IdpState`].

use std::sync::Arc;

use anyhow::Context;
use idp_auth::{
    AuthMethod, AuthenticatorChain, AuthenticatorLink, JsonCredentialStore, PasswordAuthenticator,
    PasswordHasherService, PasswordPolicy, PkiAuthenticator, TrustAnchors,
};
use idp_protocol_saml::attributes::{AttributeRetriever, JsonAttributeRetriever};
use idp_protocol_saml::endpoints::IdpState;
use idp_protocol_saml::signature::{SigningService, XmlSigner};
use idp_store::memory::DEFAULT_PURGE_INTERVAL;
use idp_store::{IdpStore, KeyValueStore, MemoryStore};
use idp_store_redis::{RedisConfig, RedisStore};

use crate::config::ServerConfig;

/// Connects the artifact and session store.
///
/// Uses Redis when `redis_url` is set; otherwise an in-memory store with a
/// background purge task.
pub async fn connect_store(config: &ServerConfig) -> anyhow::Result<IdpStore> {
    let backend: Arc<dyn KeyValueStore> = if let Some(url) = &config.redis_url {
        let redis = RedisStore::connect(RedisConfig::from_url(url))
            .await
            .context("failed to connect to Redis")?;
        tracing::info!("Using Redis artifact and session store");
        Arc::new(redis)
    } else {
        tracing::warn!(
            "REDIS_URL is not set; using the in-memory store. Artifacts and sessions are lost on restart and not shared between instances"
        );
        let memory = Arc::new(MemoryStore::new());
        memory.clone().spawn_purge_task(DEFAULT_PURGE_INTERVAL);
        memory
    };

    Ok(IdpStore::new(backend, config.request_timeout()))
}

/// Loads the configured trust anchors, if any.
pub fn load_trust_anchors(config: &ServerConfig) -> anyhow::Result<Option<Arc<TrustAnchors>>> {
    config
        .trusted_ca
        .as_ref()
        .map(|path| {
            let anchors = TrustAnchors::from_pem_file(path)
                .with_context(|| format!("failed to load trust anchors from {}", path.display()))?;
            tracing::info!(anchors = anchors.len(), "Loaded client certificate trust anchors");
            Ok(Arc::new(anchors))
        })
        .transpose()
}

/// Builds the authenticator chain in configured order.
pub fn build_chain(
    config: &ServerConfig,
    store: &IdpStore,
    anchors: Option<&Arc<TrustAnchors>>,
) -> anyhow::Result<AuthenticatorChain> {
    let links = config
        .authenticators
        .iter()
        .map(|method| match method {
            AuthMethod::Pki => {
                let anchors = anchors.context("pki authenticator needs IDP_TRUSTED_CA")?;
                Ok(AuthenticatorLink::Pki(PkiAuthenticator::new(anchors.clone())))
            }
            AuthMethod::Password => {
                let path = config
                    .credentials_file
                    .as_ref()
                    .context("password authenticator needs IDP_CREDENTIALS_FILE")?;
                let hasher = PasswordHasherService::new(PasswordPolicy::new());
                let credentials = JsonCredentialStore::from_file(path, hasher)
                    .with_context(|| format!("failed to load credentials from {}", path.display()))?;
                tracing::info!(users = credentials.len(), "Loaded password credentials");
                Ok(AuthenticatorLink::Password(PasswordAuthenticator::new(
                    Arc::new(credentials),
                    store.clone(),
                    config.session_ttl(),
                )))
            }
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(AuthenticatorChain::new(links)?)
}

/// Loads the signing key and certificate.
pub fn load_signer(config: &ServerConfig) -> anyhow::Result<SigningService> {
    let key = config
        .signing_key
        .as_ref()
        .context("IDP_SIGNING_KEY is not configured")?;
    let cert = config
        .signing_cert
        .as_ref()
        .context("IDP_SIGNING_CERT is not configured")?;

    let signer = XmlSigner::from_pem_files(key, cert).context("failed to load signing material")?;
    Ok(SigningService::new(Arc::new(signer), config.request_timeout()))
}

/// Loads the attribute retriever. Without a file, no subject has attributes.
pub fn load_attributes(config: &ServerConfig) -> anyhow::Result<Arc<dyn AttributeRetriever>> {
    let retriever = match &config.attributes_file {
        Some(path) => JsonAttributeRetriever::from_file(path)
            .with_context(|| format!("failed to load attributes from {}", path.display()))?,
        None => {
            tracing::info!("IDP_ATTRIBUTES_FILE is not set; assertions carry no attributes");
            JsonAttributeRetriever::default()
        }
    };
    Ok(Arc::new(retriever))
}

/// Assembles the protocol state from already-built parts.
pub fn assemble(
    config: &ServerConfig,
    signer: SigningService,
    store: IdpStore,
    chain: AuthenticatorChain,
    anchors: Option<Arc<TrustAnchors>>,
    retriever: Arc<dyn AttributeRetriever>,
) -> anyhow::Result<IdpState> {
    let mut builder = IdpState::builder(&config.entity_id, signer, store)
        .chain(chain)
        .retriever(retriever)
        .client_cert_header(&config.client_cert_header)
        .trusted_proxies(config.trusted_proxies.iter().copied())
        .artifact_ttl(config.artifact_ttl())
        .assertion_validity(config.assertion_validity())
        .deadline(config.request_timeout());
    if let Some(anchors) = anchors {
        if config.trusted_proxies.is_empty() {
            tracing::warn!(
                header = %config.client_cert_header,
                "Client certificate header is accepted from any peer; set IDP_TRUSTED_PROXIES"
            );
        }
        builder = builder.trust_anchors(anchors);
    }
    Ok(builder.build()?)
}

/// Builds the full protocol state from configuration.
pub async fn build_idp_state(config: &ServerConfig) -> anyhow::Result<IdpState> {
    let signer = load_signer(config)?;
    let store = connect_store(config).await?;
    let anchors = load_trust_anchors(config)?;
    let chain = build_chain(config, &store, anchors.as_ref())?;
    let retriever = load_attributes(config)?;

    tracing::info!(
        entity_id = %config.entity_id,
        authenticators = ?config.authenticators,
        "Identity provider configured"
    );
    assemble(config, signer, store, chain, anchors, retriever)
}

//! Back-channel routes.

use axum::{routing::post, Router};

use super::artifact::artifact_resolve;
use super::query::attribute_query;
use super::state::IdpState;

/// Creates the SOAP router.
///
/// | Method | Path            | Handler             |
/// |--------|-----------------|---------------------|
/// | POST   | `artifact_path` | `artifact_resolve`  |
/// | POST   | `query_path`    | `attribute_query`   |
///
/// The front-channel SSO route needs a login page and cookies, so the server
/// mounts it itself around [`super::process_sso`].
pub fn soap_router(artifact_path: &str, query_path: &str) -> Router<IdpState> {
    Router::new()
        .route(artifact_path, post(artifact_resolve))
        .route(query_path, post(attribute_query))
}

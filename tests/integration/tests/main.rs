//! End-to-end integration tests.
//!
//! The full router runs in-process over the in-memory store and is driven
//! with `tower::ServiceExt::oneshot`.

mod artifact_flow;
mod attribute_query;
mod sso_flows;
mod store_concurrency;

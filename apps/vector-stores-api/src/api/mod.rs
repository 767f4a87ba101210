//! API routes module

pub mod health;

use axum::{Router, middleware};
use axum_helpers::{AuthConfig, BearerAuth, bearer_auth_middleware};
use domain_vector_stores::{VectorStoreService, handlers};

/// Vector store routes, all behind bearer authentication.
///
/// Mounted under `/v1` by `create_router`.
pub fn routes(service: VectorStoreService, auth: &AuthConfig) -> Router {
    handlers::router(service).route_layer(middleware::from_fn_with_state(
        BearerAuth::new(auth),
        bearer_auth_middleware,
    ))
}

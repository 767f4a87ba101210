//! # Axum Helpers
//!
//! Shared HTTP plumbing for the vector stores API.
//!
//! - **[`auth`]**: static bearer-token authentication
//! - **[`server`]**: router assembly, health checks, graceful shutdown
//! - **[`http`]**: CORS and security header middleware
//! - **[`errors`]**: OpenAI-compatible error envelopes with stable codes
//! - **[`extractors`]**: validated JSON bodies and prefixed path ids
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum_helpers::server::{RouterConfig, create_router, health_router, serve_with_shutdown};
//! use core_config::{app_info, server::ServerConfig};
//!
//! let router = create_router::<ApiDoc>(api_routes, &RouterConfig::default())
//!     .merge(health_router(app_info!()));
//! serve_with_shutdown(router, &ServerConfig::default(), async {}).await?;
//! ```

pub mod auth;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use auth::{AuthConfig, BearerAuth, bearer_auth_middleware};

pub use server::{
    HealthCheckFuture, HealthResponse, ReadyResponse, RouterConfig, ShutdownCoordinator,
    create_router, health_router, run_health_checks, serve_with_shutdown, shutdown_signal,
};

pub use http::{create_cors_layer, security_headers};

pub use errors::{AppError, ErrorBody, ErrorCode, ErrorResponse};

pub use extractors::{IdPrefix, PrefixedId, ValidatedJson};

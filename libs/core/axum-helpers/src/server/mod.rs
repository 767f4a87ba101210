//! Server infrastructure: router assembly, health probes, graceful shutdown.
//!
//! ```ignore
//! use axum_helpers::server::{RouterConfig, create_router, health_router, serve_with_shutdown};
//!
//! let app = create_router::<ApiDoc>(api_routes, &RouterConfig::default())
//!     .merge(health_router(app_info!()));
//! serve_with_shutdown(app, &server_config, async move { db.close().await.ok(); }).await?;
//! ```

pub mod app;
pub mod health;
pub mod shutdown;

pub use app::{RouterConfig, create_router, serve_with_shutdown};
pub use health::{
    HealthCheckFuture, HealthResponse, ReadyResponse, health_handler, health_router,
    run_health_checks,
};
pub use shutdown::{ShutdownCoordinator, shutdown_signal};

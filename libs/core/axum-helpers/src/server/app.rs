use super::shutdown::ShutdownCoordinator;
use crate::errors::handlers::not_found;
use crate::http::{create_cors_layer, security_headers};
use axum::{Router, extract::DefaultBodyLimit, middleware};
use core_config::server::ServerConfig;
use std::future::Future;
use std::io;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Cross-cutting settings applied by [`create_router`].
#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Mount point for the API routes, e.g. `/v1`.
    pub api_prefix: String,
    /// Comma-separated origins; `None` means permissive.
    pub cors_allowed_origins: Option<String>,
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/v1".to_string(),
            cors_allowed_origins: None,
            request_timeout: Duration::from_secs(60),
            body_limit_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Wraps the API routes with docs, tracing, CORS, compression and limits.
///
/// - API routes are nested under `config.api_prefix`
/// - Swagger UI at `/swagger-ui`, document at `/openapi.json`
/// - unmatched paths fall back to a JSON 404 envelope
///
/// Health routes are merged by the caller afterwards so probes skip the
/// request timeout and body limit.
pub fn create_router<T>(apis: Router, config: &RouterConfig) -> Router
where
    T: OpenApi + 'static,
{
    #[allow(deprecated)]
    let timeout = TimeoutLayer::new(config.request_timeout);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", T::openapi()))
        .nest(&config.api_prefix, apis)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(timeout)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn(security_headers))
        .layer(create_cors_layer(config.cors_allowed_origins.as_deref()))
        .layer(CompressionLayer::new())
}

/// Serves `router` until SIGINT/SIGTERM, then runs `cleanup` under a deadline.
///
/// In-flight requests are drained before `cleanup` starts, so closing the
/// database pool there cannot cut a running transaction short.
pub async fn serve_with_shutdown<F>(
    router: Router,
    server_config: &ServerConfig,
    cleanup: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let coordinator = ShutdownCoordinator::new();
    let signals = coordinator.clone();
    tokio::spawn(async move { signals.listen_for_signals().await });

    let listener = tokio::net::TcpListener::bind(server_config.address()).await?;
    info!("Server starting on {}", listener.local_addr()?);

    let drained = coordinator.clone();
    let serve_result = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move { drained.wait().await })
        .await
        .inspect_err(|e| tracing::error!("Server encountered an error: {:?}", e));

    let shutdown_timeout = Duration::from_secs(server_config.shutdown_timeout_secs);
    info!("Running cleanup (timeout: {:?})", shutdown_timeout);
    match tokio::time::timeout(shutdown_timeout, cleanup).await {
        Ok(()) => info!("Cleanup completed"),
        Err(_) => warn!("Cleanup exceeded {:?}, exiting anyway", shutdown_timeout),
    }

    serve_result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorResponse;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[derive(OpenApi)]
    #[openapi()]
    struct EmptyDoc;

    fn app() -> Router {
        let apis = Router::new().route("/ping", get(|| async { "pong" }));
        create_router::<EmptyDoc>(apis, &RouterConfig::default())
    }

    #[tokio::test]
    async fn test_api_routes_are_nested_under_prefix() {
        let response = app()
            .oneshot(Request::get("/v1/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
    }

    #[tokio::test]
    async fn test_unknown_route_returns_error_envelope() {
        let response = app()
            .oneshot(Request::get("/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.code, crate::ErrorCode::RouteNotFound);
    }

    #[tokio::test]
    async fn test_openapi_json_is_served() {
        let response = app()
            .oneshot(Request::get("/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

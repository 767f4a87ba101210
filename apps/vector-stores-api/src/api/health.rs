//! Health check endpoints

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use axum_helpers::{HealthCheckFuture, ReadyResponse, health_router, run_health_checks};
use core_config::AppInfo;
use database::postgres::{check_health, check_pgvector};
use sea_orm::DatabaseConnection;
use std::time::Duration;

const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// `GET /ready`: the pool answers `SELECT 1` and pgvector is installed.
async fn ready(State(db): State<DatabaseConnection>) -> (StatusCode, Json<ReadyResponse>) {
    let checks: Vec<(&str, HealthCheckFuture)> = vec![
        (
            "database",
            Box::pin(async {
                check_health(&db, READY_TIMEOUT)
                    .await
                    .map_err(|e| e.to_string())
            }) as HealthCheckFuture,
        ),
        (
            "pgvector",
            Box::pin(async { check_pgvector(&db).await.map_err(|e| e.to_string()) })
                as HealthCheckFuture,
        ),
    ];
    run_health_checks(checks).await
}

/// Unauthenticated probes: `/health` (liveness) and `/ready` (readiness).
pub fn router(app_info: AppInfo, db: DatabaseConnection) -> Router {
    Router::new()
        .route("/ready", get(ready))
        .with_state(db)
        .merge(health_router(app_info))
}

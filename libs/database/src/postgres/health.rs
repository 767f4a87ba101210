use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};
use std::time::Duration;
use tracing::debug;

use crate::common::{DatabaseError, DatabaseResult};

/// Runs `SELECT 1` against the pool, failing if it takes longer than `timeout`.
///
/// Backs the readiness probe.
pub async fn check_health(db: &DatabaseConnection, timeout: Duration) -> DatabaseResult<()> {
    let stmt = Statement::from_string(DatabaseBackend::Postgres, "SELECT 1".to_owned());

    match tokio::time::timeout(timeout, db.query_one_raw(stmt)).await {
        Ok(Ok(_)) => {
            debug!("PostgreSQL health check passed");
            Ok(())
        }
        Ok(Err(e)) => Err(DatabaseError::HealthCheckFailed(format!(
            "PostgreSQL health check failed: {}",
            e
        ))),
        Err(_) => Err(DatabaseError::HealthCheckFailed(format!(
            "PostgreSQL health check timed out after {:?}",
            timeout
        ))),
    }
}

/// Verifies the `vector` extension is installed in the connected database.
pub async fn check_pgvector(db: &DatabaseConnection) -> DatabaseResult<()> {
    let stmt = Statement::from_string(
        DatabaseBackend::Postgres,
        "SELECT extversion FROM pg_extension WHERE extname = 'vector'".to_owned(),
    );

    match db.query_one_raw(stmt).await? {
        Some(_) => Ok(()),
        None => Err(DatabaseError::MissingExtension("vector")),
    }
}

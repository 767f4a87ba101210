/// Failures while connecting or probing readiness.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sea_orm::DbErr),

    #[error("Health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("PostgreSQL extension '{0}' is not installed")]
    MissingExtension(&'static str),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

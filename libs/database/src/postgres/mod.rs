//! PostgreSQL connection management, migrations and health checks.

mod config;
mod connector;
mod health;

pub use config::PostgresConfig;
pub use connector::{connect_from_config_with_retry, run_migrations};
pub use health::{check_health, check_pgvector};

pub use sea_orm::{ConnectOptions, DatabaseConnection, DbErr};

//! Configuration for Vector Stores API

use axum_helpers::{AuthConfig, RouterConfig};
use core_config::{AppInfo, FromEnv, app_info, env_parse_or, server::ServerConfig};
use database::postgres::PostgresConfig;
use domain_vector_stores::{EmbeddingConfig, FieldMappingConfig, SearchConfig, StorageConfig};
use std::time::Duration;

pub use core_config::Environment;

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub router: RouterConfig,
    pub auth: AuthConfig,
    pub postgres: PostgresConfig,
    pub fields: FieldMappingConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub storage: StorageConfig,
    /// Apply pending schema migrations on startup
    pub run_migrations: bool,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?;

        let router = RouterConfig {
            cors_allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .filter(|origins| !origins.trim().is_empty()),
            request_timeout: Duration::from_secs(server.request_timeout_secs),
            body_limit_bytes: env_parse_or("BODY_LIMIT_BYTES", RouterConfig::default().body_limit_bytes)?,
            ..RouterConfig::default()
        };

        Ok(Self {
            app: app_info!(),
            environment,
            server,
            router,
            auth: AuthConfig::from_env()?,
            postgres: PostgresConfig::from_env()?,
            fields: FieldMappingConfig::from_env()?,
            embedding: EmbeddingConfig::from_env()?,
            search: SearchConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            run_migrations: env_parse_or("RUN_MIGRATIONS", true)?,
        })
    }

    /// An empty `EMBEDDING__BASE_URL` runs without a gateway; callers must send vectors.
    pub fn gateway_enabled(&self) -> bool {
        !self.embedding.base_url.trim().is_empty()
    }
}

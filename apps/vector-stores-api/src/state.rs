//! Application state management

use domain_vector_stores::VectorStoreService;
use sea_orm::DatabaseConnection;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    pub db: DatabaseConnection,
    pub service: VectorStoreService,
}

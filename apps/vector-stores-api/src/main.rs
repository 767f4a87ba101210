//! Vector Stores API - OpenAI-compatible vector store service over pgvector

use axum_helpers::{create_router, serve_with_shutdown};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_vector_stores::{
    FieldMap, OpenAIProvider, PgEmbeddingRepository, PgVectorStoreRepository, RankingEngine,
    VectorStoreService,
};
use migration::Migrator;
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    // Fail fast on bad column names before touching the database
    let fields = Arc::new(FieldMap::new(config.fields.clone())?);
    let ranking = RankingEngine::new(&config.search);

    info!("Connecting to PostgreSQL");
    let db =
        database::postgres::connect_from_config_with_retry(config.postgres.clone(), None).await?;
    info!("Successfully connected to PostgreSQL");

    if config.run_migrations {
        database::postgres::run_migrations::<Migrator>(&db, "vector_stores_api").await?;
    }
    database::postgres::check_pgvector(&db).await?;

    let stores = Arc::new(PgVectorStoreRepository::new(db.clone()));
    let embeddings = Arc::new(PgEmbeddingRepository::new(
        db.clone(),
        fields,
        ranking,
        config.embedding.dimensions,
        &config.storage,
    ));

    let mut service = VectorStoreService::new(stores, embeddings, ranking)
        .with_storage_timeout(config.storage.timeout);
    if config.gateway_enabled() {
        let provider = OpenAIProvider::new(config.embedding.clone())?;
        service = service.with_provider(Arc::new(provider), config.embedding.timeout);
        info!(
            model = %config.embedding.model,
            dimensions = config.embedding.dimensions,
            "Embedding gateway configured"
        );
    } else {
        warn!("EMBEDDING__BASE_URL is empty; requests must carry precomputed vectors");
    }

    let state = AppState {
        config: config.clone(),
        db,
        service,
    };

    let api_routes = api::routes(state.service.clone(), &state.config.auth);
    let app = create_router::<openapi::ApiDoc>(api_routes, &state.config.router).merge(
        api::health::router(state.config.app.clone(), state.db.clone()),
    );

    info!(
        "Starting Vector Stores API on {}",
        state.config.server.address()
    );

    let db = state.db.clone();
    serve_with_shutdown(app, &state.config.server, async move {
        info!("Shutting down: closing database connections");
        if let Err(e) = db.close().await {
            warn!("Error closing database pool: {}", e);
        }
    })
    .await?;

    info!("Vector Stores API shutdown complete");
    Ok(())
}

//! Vector Stores Domain
//!
//! OpenAI-compatible vector stores: named collections of text embeddings
//! that can be searched by vector similarity.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, id and body validation
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐      ┌──────────────────┐
//! │   Service   │ ───▶ │ EmbeddingProvider│  ← text → vector gateway
//! └──────┬──────┘      └──────────────────┘
//!        │
//! ┌──────▼──────┐      ┌──────────────────┐
//! │ Repository  │ ───▶ │  RankingEngine   │  ← metric, limits, scores
//! └──────┬──────┘      └──────────────────┘
//!        │
//! ┌──────▼──────┐
//! │  FieldMap   │  ← configurable embedding table/column names
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_vector_stores::{
//!     handlers,
//!     ranking::RankingEngine,
//!     repository::InMemoryVectorStoreRepository,
//!     service::VectorStoreService,
//! };
//!
//! let repository = Arc::new(InMemoryVectorStoreRepository::new(1536, RankingEngine::default()));
//! let service = VectorStoreService::new(repository.clone(), repository, RankingEngine::default());
//!
//! let router = handlers::router(service);
//! ```

pub mod config;
pub mod embedding;
pub mod entity;
pub mod error;
pub mod fields;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod ranking;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use config::{EmbeddingConfig, SearchConfig, StorageConfig};
pub use embedding::{EmbeddingProvider, OpenAIProvider};
pub use error::{VectorStoreError, VectorStoreResult};
pub use fields::{FieldMap, FieldMappingConfig};
pub use models::{
    CreateEmbeddingBatchRequest, CreateEmbeddingRequest, CreateVectorStoreRequest, Embedding,
    ModifyVectorStoreRequest, SearchRequest, SearchResponse, VectorStore, VectorStoreObject,
};
pub use postgres::{PgEmbeddingRepository, PgVectorStoreRepository};
pub use ranking::{RankingEngine, SimilarityMetric};
pub use repository::{EmbeddingRepository, InMemoryVectorStoreRepository, VectorStoreRepository};
pub use service::VectorStoreService;

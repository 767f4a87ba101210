//! Schema for the vector stores service, applied through `sea-orm-migration`.
//!
//! Applied migrations are recorded in `seaql_migrations`, so a restart only
//! runs what is new.

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_vector_stores;
mod m20250101_000002_create_embeddings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_vector_stores::Migration),
            Box::new(m20250101_000002_create_embeddings::Migration),
        ]
    }
}

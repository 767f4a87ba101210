use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // Default embeddings table. Deployments with DB_FIELDS__* overrides
        // point at their own table. The column is untyped `vector`, the width
        // is checked before every write.
        db.execute_unprepared(
            r#"
            CREATE TABLE IF NOT EXISTS embeddings (
                id              TEXT PRIMARY KEY,
                vector_store_id TEXT NOT NULL REFERENCES vector_stores (id) ON DELETE CASCADE,
                content         TEXT NOT NULL,
                embedding       vector NOT NULL,
                metadata        JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at      TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .await?;

        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS embeddings_store_created_idx \
             ON embeddings (vector_store_id, created_at, id)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS embeddings")
            .await?;

        Ok(())
    }
}

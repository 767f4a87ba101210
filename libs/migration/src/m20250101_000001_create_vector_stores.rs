use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared("CREATE EXTENSION IF NOT EXISTS vector")
            .await?;

        db.execute_unprepared(
            r#"
            CREATE TABLE IF NOT EXISTS vector_stores (
                id                      TEXT PRIMARY KEY,
                name                    TEXT NOT NULL,
                usage_bytes             BIGINT NOT NULL DEFAULT 0,
                file_counts_in_progress BIGINT NOT NULL DEFAULT 0,
                file_counts_completed   BIGINT NOT NULL DEFAULT 0,
                file_counts_failed      BIGINT NOT NULL DEFAULT 0,
                file_counts_cancelled   BIGINT NOT NULL DEFAULT 0,
                expires_after           JSONB,
                expires_at              TIMESTAMPTZ,
                last_active_at          TIMESTAMPTZ,
                metadata                JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at              TIMESTAMPTZ NOT NULL DEFAULT now(),
                CONSTRAINT vector_stores_counts_non_negative CHECK (
                    usage_bytes >= 0
                    AND file_counts_in_progress >= 0
                    AND file_counts_completed >= 0
                    AND file_counts_failed >= 0
                    AND file_counts_cancelled >= 0
                )
            )
            "#,
        )
        .await?;

        // Keyset pagination over (created_at, id) in both directions
        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS vector_stores_created_at_id_idx \
             ON vector_stores (created_at DESC, id DESC)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS vector_stores")
            .await?;

        // The vector extension stays; other schemas in the database may use it
        Ok(())
    }
}

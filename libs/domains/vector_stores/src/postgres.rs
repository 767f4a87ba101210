//! PostgreSQL + pgvector repositories.
//!
//! Store rows go through the Sea-ORM entity. Embedding rows live in a table
//! whose column names come from the [`FieldMap`], so their SQL is assembled
//! here from quoted, pre-validated identifiers and bound parameters only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend,
    EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Statement,
    TransactionTrait, Value,
};
use std::sync::Arc;
use tracing::instrument;

use crate::config::StorageConfig;
use crate::entity::{self, expires_after_to_json, metadata_from_json};
use crate::error::{VectorStoreError, VectorStoreResult};
use crate::fields::{Field, FieldMap, VECTOR_STORES_TABLE};
use crate::models::{
    Embedding, ListParams, NewEmbedding, NewVectorStore, Page, SearchHit, SortOrder, VectorStore,
    VectorStoreChanges, now,
};
use crate::ranking::{MetadataFilter, RankingEngine, SimilarityMetric};
use crate::repository::{
    EmbeddingRepository, SearchQuery, VectorStoreRepository, batch_totals, check_batch,
    check_vector,
};

/// Bound parameters per embedding row in a multi-row `INSERT`.
const PARAMS_PER_ROW: usize = 6;
/// Postgres caps a statement at 65535 bind parameters.
const MAX_ROWS_PER_STATEMENT: usize = 65_535 / PARAMS_PER_ROW;

/// pgvector text literal, e.g. `[0.1,0.2,0.3]`.
pub(crate) fn vector_literal(vector: &[f32]) -> String {
    let parts: Vec<String> = vector.iter().map(f32::to_string).collect();
    format!("[{}]", parts.join(","))
}

/// Relative counter update that also proves the store exists and locks its row.
///
/// Returns `None` when no store has this id.
async fn bump_store_counters<C: ConnectionTrait>(
    conn: &C,
    store_id: &str,
    delta_bytes: i64,
    delta_completed: i64,
    at: DateTime<Utc>,
) -> VectorStoreResult<Option<VectorStore>> {
    let sql = format!(
        r#"UPDATE "{table}"
SET usage_bytes = usage_bytes + $2,
    file_counts_completed = file_counts_completed + $3,
    last_active_at = $4,
    expires_at = CASE
        WHEN expires_after IS NULL THEN expires_at
        ELSE $4 + make_interval(days => (expires_after ->> 'days')::int)
    END
WHERE id = $1
RETURNING *"#,
        table = VECTOR_STORES_TABLE
    );

    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        sql,
        [
            store_id.into(),
            delta_bytes.into(),
            delta_completed.into(),
            at.into(),
        ],
    );

    entity::Entity::find()
        .from_raw_sql(stmt)
        .one(conn)
        .await?
        .map(VectorStore::try_from)
        .transpose()
}

// ============================================================================
// Store repository
// ============================================================================

pub struct PgVectorStoreRepository {
    db: DatabaseConnection,
}

impl PgVectorStoreRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VectorStoreRepository for PgVectorStoreRepository {
    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create(&self, input: NewVectorStore) -> VectorStoreResult<VectorStore> {
        let store = VectorStore::new(input);
        let active_model = entity::ActiveModel::try_from(&store)?;
        let model = active_model.insert(&self.db).await?;

        tracing::info!(vector_store_id = %model.id, "Created vector store");
        VectorStore::try_from(model)
    }

    async fn get(&self, id: &str) -> VectorStoreResult<Option<VectorStore>> {
        entity::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(VectorStore::try_from)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn list(&self, params: ListParams) -> VectorStoreResult<Page<VectorStore>> {
        let mut query = entity::Entity::find();

        if let Some(after) = &params.after {
            let cursor = entity::Entity::find_by_id(after.clone())
                .one(&self.db)
                .await?
                .ok_or_else(|| {
                    VectorStoreError::invalid_param("after", format!("Unknown cursor '{}'", after))
                })?;

            let keyset = match params.order {
                SortOrder::Desc => Condition::any()
                    .add(entity::Column::CreatedAt.lt(cursor.created_at))
                    .add(
                        Condition::all()
                            .add(entity::Column::CreatedAt.eq(cursor.created_at))
                            .add(entity::Column::Id.lt(cursor.id.clone())),
                    ),
                SortOrder::Asc => Condition::any()
                    .add(entity::Column::CreatedAt.gt(cursor.created_at))
                    .add(
                        Condition::all()
                            .add(entity::Column::CreatedAt.eq(cursor.created_at))
                            .add(entity::Column::Id.gt(cursor.id.clone())),
                    ),
            };
            query = query.filter(keyset);
        }

        query = match params.order {
            SortOrder::Desc => query
                .order_by_desc(entity::Column::CreatedAt)
                .order_by_desc(entity::Column::Id),
            SortOrder::Asc => query
                .order_by_asc(entity::Column::CreatedAt)
                .order_by_asc(entity::Column::Id),
        };

        let mut models = query.limit(params.limit + 1).all(&self.db).await?;
        let has_more = models.len() as u64 > params.limit;
        models.truncate(usize::try_from(params.limit).unwrap_or(usize::MAX));

        let items = models
            .into_iter()
            .map(VectorStore::try_from)
            .collect::<VectorStoreResult<Vec<_>>>()?;

        Ok(Page { items, has_more })
    }

    #[instrument(skip(self, changes))]
    async fn update(
        &self,
        id: &str,
        changes: VectorStoreChanges,
    ) -> VectorStoreResult<VectorStore> {
        let txn = self.db.begin().await?;

        let model = entity::Entity::find_by_id(id.to_string())
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| VectorStoreError::store_not_found(id))?;

        let mut store = VectorStore::try_from(model)?;
        store.apply_changes(changes);

        let active_model = entity::ActiveModel {
            id: Set(store.id.clone()),
            name: Set(store.name.clone()),
            metadata: Set(serde_json::Value::Object(store.metadata.clone())),
            expires_after: Set(expires_after_to_json(store.expires_after.as_ref())?),
            expires_at: Set(store.expires_at),
            ..Default::default()
        };
        let updated = active_model.update(&txn).await?;
        txn.commit().await?;

        tracing::info!(vector_store_id = %id, "Updated vector store");
        VectorStore::try_from(updated)
    }

    async fn increment_usage(
        &self,
        id: &str,
        delta_bytes: i64,
        delta_completed: i64,
    ) -> VectorStoreResult<VectorStore> {
        bump_store_counters(&self.db, id, delta_bytes, delta_completed, now())
            .await?
            .ok_or_else(|| VectorStoreError::store_not_found(id))
    }
}

// ============================================================================
// Embedding repository
// ============================================================================

#[derive(Debug, FromQueryResult)]
struct SearchRow {
    id: String,
    content: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    distance: Option<f64>,
}

/// SQL builder over the mapped embeddings table.
#[derive(Debug, Clone)]
pub struct EmbeddingSql {
    fields: Arc<FieldMap>,
}

impl EmbeddingSql {
    pub fn new(fields: Arc<FieldMap>) -> Self {
        Self { fields }
    }

    /// Multi-row insert of `rows` embeddings with six parameters per row.
    pub fn insert(&self, rows: usize) -> String {
        let f = &self.fields;
        let values: Vec<String> = (0..rows)
            .map(|row| {
                let p = row * PARAMS_PER_ROW;
                format!(
                    "(${}, ${}, ${}, ${}::vector, ${}, ${})",
                    p + 1,
                    p + 2,
                    p + 3,
                    p + 4,
                    p + 5,
                    p + 6
                )
            })
            .collect();

        format!(
            "INSERT INTO {} ({}, {}, {}, {}, {}, {}) VALUES {}",
            f.quoted_table(),
            f.quoted(Field::Id),
            f.quoted(Field::VectorStoreId),
            f.quoted(Field::Content),
            f.quoted(Field::Embedding),
            f.quoted(Field::Metadata),
            f.quoted(Field::CreatedAt),
            values.join(", ")
        )
    }

    /// Nearest-neighbour query scoped to one store.
    ///
    /// Parameters: `$1` query vector, `$2` store id, then one key/value pair
    /// per filter entry, then the limit.
    pub fn search(&self, metric: SimilarityMetric, filter_pairs: usize) -> String {
        let f = &self.fields;
        let mut conditions = vec![format!("{} = $2", f.quoted(Field::VectorStoreId))];
        for i in 0..filter_pairs {
            let key = 3 + i * 2;
            conditions.push(format!(
                "({} -> ${}) = ${}::jsonb",
                f.quoted(Field::Metadata),
                key,
                key + 1
            ));
        }
        let limit_param = 3 + filter_pairs * 2;

        format!(
            "SELECT {id} AS id, {content} AS content, {metadata} AS metadata, \
             {created_at} AS created_at, ({embedding} {op} $1::vector)::float8 AS distance \
             FROM {table} WHERE {conditions} \
             ORDER BY distance ASC, {created_at} ASC, {id} ASC LIMIT ${limit}",
            id = f.quoted(Field::Id),
            content = f.quoted(Field::Content),
            metadata = f.quoted(Field::Metadata),
            created_at = f.quoted(Field::CreatedAt),
            embedding = f.quoted(Field::Embedding),
            op = metric.operator(),
            table = f.quoted_table(),
            conditions = conditions.join(" AND "),
            limit = limit_param
        )
    }
}

pub struct PgEmbeddingRepository {
    db: DatabaseConnection,
    sql: EmbeddingSql,
    ranking: RankingEngine,
    dimensions: usize,
    chunk_size: usize,
}

impl PgEmbeddingRepository {
    pub fn new(
        db: DatabaseConnection,
        fields: Arc<FieldMap>,
        ranking: RankingEngine,
        dimensions: usize,
        storage: &StorageConfig,
    ) -> Self {
        Self {
            db,
            sql: EmbeddingSql::new(fields),
            ranking,
            dimensions,
            chunk_size: storage.insert_chunk_size.clamp(1, MAX_ROWS_PER_STATEMENT),
        }
    }

    fn insert_statement(&self, rows: &[Embedding]) -> Statement {
        let mut values: Vec<Value> = Vec::with_capacity(rows.len() * PARAMS_PER_ROW);
        for row in rows {
            values.push(row.id.clone().into());
            values.push(row.vector_store_id.clone().into());
            values.push(row.content.clone().into());
            values.push(vector_literal(&row.embedding).into());
            values.push(serde_json::Value::Object(row.metadata.clone()).into());
            values.push(row.created_at.into());
        }
        Statement::from_sql_and_values(DbBackend::Postgres, self.sql.insert(rows.len()), values)
    }

    fn search_statement(&self, store_id: &str, query: &SearchQuery) -> Statement {
        let filter: &MetadataFilter = &query.filter;
        let mut values: Vec<Value> = vec![vector_literal(&query.vector).into(), store_id.into()];
        for (key, value) in filter.pairs() {
            values.push(key.clone().into());
            values.push(value.clone().into());
        }
        values.push(i64::try_from(query.limit).unwrap_or(i64::MAX).into());

        Statement::from_sql_and_values(
            DbBackend::Postgres,
            self.sql.search(self.ranking.metric(), filter.pairs().count()),
            values,
        )
    }

    async fn store_exists(&self, store_id: &str) -> VectorStoreResult<bool> {
        Ok(entity::Entity::find_by_id(store_id.to_string())
            .select_only()
            .column(entity::Column::Id)
            .into_tuple::<String>()
            .one(&self.db)
            .await?
            .is_some())
    }
}

#[async_trait]
impl EmbeddingRepository for PgEmbeddingRepository {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn insert_one(&self, store_id: &str, item: NewEmbedding) -> VectorStoreResult<Embedding> {
        let mut inserted = self.insert_batch(store_id, vec![item]).await?;
        inserted
            .pop()
            .ok_or_else(|| VectorStoreError::Storage("insert returned no rows".to_string()))
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn insert_batch(
        &self,
        store_id: &str,
        items: Vec<NewEmbedding>,
    ) -> VectorStoreResult<Vec<Embedding>> {
        check_batch(self.dimensions, &items)?;
        let (bytes, count) = batch_totals(&items);
        let created_at = now();

        let txn = self.db.begin().await?;

        // Counters first: takes the row lock and proves the store exists.
        // Returning early drops `txn`, which rolls it back.
        if bump_store_counters(&txn, store_id, bytes, count, created_at)
            .await?
            .is_none()
        {
            return Err(VectorStoreError::store_not_found(store_id));
        }

        let inserted: Vec<Embedding> = items
            .into_iter()
            .map(|item| Embedding::new(store_id, item, created_at))
            .collect();

        for chunk in inserted.chunks(self.chunk_size) {
            txn.execute_raw(self.insert_statement(chunk)).await?;
        }

        txn.commit().await?;

        tracing::info!(vector_store_id = %store_id, count, bytes, "Inserted embeddings");
        Ok(inserted)
    }

    #[instrument(skip(self, query), fields(limit = query.limit))]
    async fn search(&self, store_id: &str, query: SearchQuery) -> VectorStoreResult<Vec<SearchHit>> {
        check_vector(self.dimensions, &query.vector)?;

        if !self.store_exists(store_id).await? {
            return Err(VectorStoreError::store_not_found(store_id));
        }

        let rows = SearchRow::find_by_statement(self.search_statement(store_id, &query))
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| SearchHit {
                score: self.ranking.score_distance(row.distance.unwrap_or(f64::NAN)),
                id: row.id,
                content: row.content,
                metadata: metadata_from_json(row.metadata),
                created_at: row.created_at,
            })
            .collect())
    }
}

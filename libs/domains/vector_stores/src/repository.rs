use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{VectorStoreError, VectorStoreResult};
use crate::models::{
    Embedding, ListParams, NewEmbedding, NewVectorStore, Page, SearchHit, SortOrder, VectorStore,
    VectorStoreChanges, now,
};
use crate::ranking::{MetadataFilter, RankingEngine};

/// Repository trait for vector store records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStoreRepository: Send + Sync {
    /// Persist a new store with zeroed counters
    async fn create(&self, input: NewVectorStore) -> VectorStoreResult<VectorStore>;

    /// Get a store by ID
    async fn get(&self, id: &str) -> VectorStoreResult<Option<VectorStore>>;

    /// Keyset page over `(created_at, id)`; an unknown `after` is a validation error
    async fn list(&self, params: ListParams) -> VectorStoreResult<Page<VectorStore>>;

    /// Apply name/metadata/expiry changes
    async fn update(&self, id: &str, changes: VectorStoreChanges)
    -> VectorStoreResult<VectorStore>;

    /// Relative counter bump; also marks the store active
    async fn increment_usage(
        &self,
        id: &str,
        delta_bytes: i64,
        delta_completed: i64,
    ) -> VectorStoreResult<VectorStore>;
}

/// Query vector plus the already-resolved limit and filter.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub vector: Vec<f32>,
    pub limit: u64,
    pub filter: MetadataFilter,
}

/// Repository trait for embedding rows scoped to one store
///
/// Inserts update the owning store's counters in the same transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingRepository: Send + Sync {
    /// Vector width every row must have
    fn dimensions(&self) -> usize;

    async fn insert_one(&self, store_id: &str, item: NewEmbedding) -> VectorStoreResult<Embedding>;

    /// All-or-nothing insert
    async fn insert_batch(
        &self,
        store_id: &str,
        items: Vec<NewEmbedding>,
    ) -> VectorStoreResult<Vec<Embedding>>;

    async fn search(&self, store_id: &str, query: SearchQuery) -> VectorStoreResult<Vec<SearchHit>>;
}

/// Checks width first, then that every component is finite.
pub(crate) fn check_vector(dimensions: usize, vector: &[f32]) -> VectorStoreResult<()> {
    VectorStoreError::check_dimensions(dimensions, vector.len())?;
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(VectorStoreError::validation(
            "vector components must be finite numbers",
        ));
    }
    Ok(())
}

/// Rejects empty batches and any item with a bad vector.
pub(crate) fn check_batch(dimensions: usize, items: &[NewEmbedding]) -> VectorStoreResult<()> {
    if items.is_empty() {
        return Err(VectorStoreError::invalid_param(
            "embeddings",
            "batch must contain at least one item",
        ));
    }
    for item in items {
        check_vector(dimensions, &item.embedding)?;
    }
    Ok(())
}

/// Sum of content bytes and item count of a batch.
pub(crate) fn batch_totals(items: &[NewEmbedding]) -> (i64, i64) {
    let bytes = items.iter().map(NewEmbedding::content_bytes).sum();
    (bytes, items.len() as i64)
}

#[derive(Debug, Default)]
struct Storage {
    stores: HashMap<String, VectorStore>,
    embeddings: HashMap<String, Vec<Embedding>>,
}

/// In-memory implementation of both repositories (for development/testing)
///
/// Stores and embeddings sit behind one lock, so counter updates and inserts
/// are applied together.
#[derive(Debug, Clone)]
pub struct InMemoryVectorStoreRepository {
    storage: Arc<RwLock<Storage>>,
    dimensions: usize,
    ranking: RankingEngine,
}

impl InMemoryVectorStoreRepository {
    pub fn new(dimensions: usize, ranking: RankingEngine) -> Self {
        Self {
            storage: Arc::new(RwLock::new(Storage::default())),
            dimensions,
            ranking,
        }
    }

    pub async fn embedding_count(&self, store_id: &str) -> usize {
        self.storage
            .read()
            .await
            .embeddings
            .get(store_id)
            .map_or(0, Vec::len)
    }
}

fn keyset_cmp(a: &VectorStore, b: &VectorStore) -> std::cmp::Ordering {
    a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl VectorStoreRepository for InMemoryVectorStoreRepository {
    async fn create(&self, input: NewVectorStore) -> VectorStoreResult<VectorStore> {
        let store = VectorStore::new(input);
        let mut storage = self.storage.write().await;
        storage.stores.insert(store.id.clone(), store.clone());
        storage.embeddings.insert(store.id.clone(), Vec::new());

        tracing::info!(vector_store_id = %store.id, "Created vector store");
        Ok(store)
    }

    async fn get(&self, id: &str) -> VectorStoreResult<Option<VectorStore>> {
        Ok(self.storage.read().await.stores.get(id).cloned())
    }

    async fn list(&self, params: ListParams) -> VectorStoreResult<Page<VectorStore>> {
        let storage = self.storage.read().await;

        let cursor = match &params.after {
            Some(after) => Some(storage.stores.get(after).ok_or_else(|| {
                VectorStoreError::invalid_param("after", format!("Unknown cursor '{}'", after))
            })?),
            None => None,
        };

        let mut stores: Vec<&VectorStore> = storage
            .stores
            .values()
            .filter(|store| match (cursor, params.order) {
                (None, _) => true,
                (Some(c), SortOrder::Desc) => keyset_cmp(store, c).is_lt(),
                (Some(c), SortOrder::Asc) => keyset_cmp(store, c).is_gt(),
            })
            .collect();

        match params.order {
            SortOrder::Desc => stores.sort_by(|a, b| keyset_cmp(b, a)),
            SortOrder::Asc => stores.sort_by(|a, b| keyset_cmp(a, b)),
        }

        let limit = usize::try_from(params.limit).unwrap_or(usize::MAX);
        let has_more = stores.len() > limit;
        let items = stores.into_iter().take(limit).cloned().collect();

        Ok(Page { items, has_more })
    }

    async fn update(
        &self,
        id: &str,
        changes: VectorStoreChanges,
    ) -> VectorStoreResult<VectorStore> {
        let mut storage = self.storage.write().await;
        let store = storage
            .stores
            .get_mut(id)
            .ok_or_else(|| VectorStoreError::store_not_found(id))?;
        store.apply_changes(changes);

        tracing::info!(vector_store_id = %id, "Updated vector store");
        Ok(store.clone())
    }

    async fn increment_usage(
        &self,
        id: &str,
        delta_bytes: i64,
        delta_completed: i64,
    ) -> VectorStoreResult<VectorStore> {
        let mut storage = self.storage.write().await;
        let store = storage
            .stores
            .get_mut(id)
            .ok_or_else(|| VectorStoreError::store_not_found(id))?;
        store.usage_bytes += delta_bytes;
        store.file_counts.completed += delta_completed;
        store.mark_active(now());
        Ok(store.clone())
    }
}

#[async_trait]
impl EmbeddingRepository for InMemoryVectorStoreRepository {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn insert_one(&self, store_id: &str, item: NewEmbedding) -> VectorStoreResult<Embedding> {
        let mut inserted = self.insert_batch(store_id, vec![item]).await?;
        inserted
            .pop()
            .ok_or_else(|| VectorStoreError::Storage("insert returned no rows".to_string()))
    }

    async fn insert_batch(
        &self,
        store_id: &str,
        items: Vec<NewEmbedding>,
    ) -> VectorStoreResult<Vec<Embedding>> {
        check_batch(self.dimensions, &items)?;
        let (bytes, count) = batch_totals(&items);

        let mut storage = self.storage.write().await;
        let created_at = now();
        let store = storage
            .stores
            .get_mut(store_id)
            .ok_or_else(|| VectorStoreError::store_not_found(store_id))?;
        store.usage_bytes += bytes;
        store.file_counts.completed += count;
        store.mark_active(created_at);

        let inserted: Vec<Embedding> = items
            .into_iter()
            .map(|item| Embedding::new(store_id, item, created_at))
            .collect();
        storage
            .embeddings
            .entry(store_id.to_string())
            .or_default()
            .extend(inserted.iter().cloned());

        tracing::info!(vector_store_id = %store_id, count, bytes, "Inserted embeddings");
        Ok(inserted)
    }

    async fn search(&self, store_id: &str, query: SearchQuery) -> VectorStoreResult<Vec<SearchHit>> {
        check_vector(self.dimensions, &query.vector)?;

        let storage = self.storage.read().await;
        if !storage.stores.contains_key(store_id) {
            return Err(VectorStoreError::store_not_found(store_id));
        }
        let candidates = storage.embeddings.get(store_id).into_iter().flatten();

        Ok(self
            .ranking
            .rank(&query.vector, candidates, &query.filter, query.limit))
    }
}

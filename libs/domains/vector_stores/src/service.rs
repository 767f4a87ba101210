use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use validator::Validate;

use crate::embedding::EmbeddingProvider;
use crate::error::{VectorStoreError, VectorStoreResult};
use crate::models::{
    CreateEmbeddingBatchRequest, CreateEmbeddingRequest, CreateVectorStoreRequest,
    DEFAULT_LIST_LIMIT, EmbeddingBatchObject, EmbeddingObject, ListParams, ListVectorStoresQuery,
    MAX_LIST_LIMIT, ModifyVectorStoreRequest, NewEmbedding, SearchRequest, SearchResponse,
    VectorStore, VectorStoreList, VectorStoreObject,
};
use crate::ranking::RankingEngine;
use crate::repository::{EmbeddingRepository, SearchQuery, VectorStoreRepository};

/// Orchestrates validation, the embedding gateway and both repositories.
///
/// Every repository call runs under the storage deadline and every gateway
/// call under the gateway deadline; expiry yields the matching `*Timeout`
/// error rather than hanging the request.
#[derive(Clone)]
pub struct VectorStoreService {
    stores: Arc<dyn VectorStoreRepository>,
    embeddings: Arc<dyn EmbeddingRepository>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    ranking: RankingEngine,
    storage_timeout: Duration,
    gateway_timeout: Duration,
}

impl VectorStoreService {
    pub fn new(
        stores: Arc<dyn VectorStoreRepository>,
        embeddings: Arc<dyn EmbeddingRepository>,
        ranking: RankingEngine,
    ) -> Self {
        Self {
            stores,
            embeddings,
            provider: None,
            ranking,
            storage_timeout: Duration::from_secs(30),
            gateway_timeout: Duration::from_secs(30),
        }
    }

    /// Enables text inputs; without a provider callers must send vectors.
    pub fn with_provider(mut self, provider: Arc<dyn EmbeddingProvider>, timeout: Duration) -> Self {
        self.provider = Some(provider);
        self.gateway_timeout = timeout;
        self
    }

    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    async fn storage<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = VectorStoreResult<T>>,
    ) -> VectorStoreResult<T> {
        tokio::time::timeout(self.storage_timeout, fut)
            .await
            .map_err(|_| {
                tracing::warn!(operation, timeout = ?self.storage_timeout, "Storage call timed out");
                VectorStoreError::StorageTimeout(format!(
                    "{} exceeded {:?}",
                    operation, self.storage_timeout
                ))
            })?
    }

    async fn gateway<T>(
        &self,
        fut: impl Future<Output = VectorStoreResult<T>>,
    ) -> VectorStoreResult<T> {
        tokio::time::timeout(self.gateway_timeout, fut)
            .await
            .map_err(|_| {
                tracing::warn!(timeout = ?self.gateway_timeout, "Embedding gateway timed out");
                VectorStoreError::GatewayTimeout(format!("exceeded {:?}", self.gateway_timeout))
            })?
    }

    fn provider(&self, param: &str) -> VectorStoreResult<&Arc<dyn EmbeddingProvider>> {
        self.provider.as_ref().ok_or_else(|| {
            VectorStoreError::invalid_param(
                param,
                "no embedding gateway is configured; supply vectors explicitly",
            )
        })
    }

    fn check_gateway_vector(&self, vector: &[f32]) -> VectorStoreResult<()> {
        let expected = self.embeddings.dimensions();
        if vector.len() != expected {
            return Err(VectorStoreError::Gateway(format!(
                "gateway returned a {}-dimensional vector, expected {}",
                vector.len(),
                expected
            )));
        }
        Ok(())
    }

    async fn require_store(&self, id: &str) -> VectorStoreResult<VectorStore> {
        self.storage("get_vector_store", self.stores.get(id))
            .await?
            .ok_or_else(|| VectorStoreError::store_not_found(id))
    }

    // ------------------------------------------------------------------------
    // Stores
    // ------------------------------------------------------------------------

    #[instrument(skip(self, input))]
    pub async fn create_vector_store(
        &self,
        input: CreateVectorStoreRequest,
    ) -> VectorStoreResult<VectorStoreObject> {
        input.validate()?;
        let store = self
            .storage("create_vector_store", self.stores.create(input.into()))
            .await?;
        Ok(store.into())
    }

    #[instrument(skip(self))]
    pub async fn get_vector_store(&self, id: &str) -> VectorStoreResult<VectorStoreObject> {
        Ok(self.require_store(id).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn list_vector_stores(
        &self,
        query: ListVectorStoresQuery,
    ) -> VectorStoreResult<VectorStoreList> {
        let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        if limit == 0 || limit > MAX_LIST_LIMIT {
            return Err(VectorStoreError::invalid_param(
                "limit",
                format!("limit must be between 1 and {}", MAX_LIST_LIMIT),
            ));
        }

        let params = ListParams {
            limit,
            after: query.after,
            order: query.order.unwrap_or_default(),
        };
        let page = self
            .storage("list_vector_stores", self.stores.list(params))
            .await?;
        Ok(page.into())
    }

    #[instrument(skip(self, input))]
    pub async fn modify_vector_store(
        &self,
        id: &str,
        input: ModifyVectorStoreRequest,
    ) -> VectorStoreResult<VectorStoreObject> {
        input.validate()?;
        let store = self
            .storage("modify_vector_store", self.stores.update(id, input.into()))
            .await?;
        Ok(store.into())
    }

    // ------------------------------------------------------------------------
    // Embeddings
    // ------------------------------------------------------------------------

    #[instrument(skip(self, input))]
    pub async fn create_embedding(
        &self,
        store_id: &str,
        input: CreateEmbeddingRequest,
    ) -> VectorStoreResult<EmbeddingObject> {
        input.validate()?;

        let vector = match input.embedding {
            Some(vector) => {
                VectorStoreError::check_dimensions(self.embeddings.dimensions(), vector.len())?;
                vector
            }
            None => {
                let provider = self.provider("embedding")?;
                self.require_store(store_id).await?;
                let output = self.gateway(provider.embed(&input.content)).await?;
                self.check_gateway_vector(&output.vector)?;
                output.vector
            }
        };

        let item = NewEmbedding {
            content: input.content,
            embedding: vector,
            metadata: input.metadata.unwrap_or_default(),
        };
        let embedding = self
            .storage("insert_embedding", self.embeddings.insert_one(store_id, item))
            .await?;
        Ok(embedding.into())
    }

    /// All items are checked before the gateway or storage is touched.
    #[instrument(skip(self, input), fields(count = input.embeddings.len()))]
    pub async fn create_embedding_batch(
        &self,
        store_id: &str,
        input: CreateEmbeddingBatchRequest,
    ) -> VectorStoreResult<EmbeddingBatchObject> {
        input.validate()?;

        let dimensions = self.embeddings.dimensions();
        for supplied in input.embeddings.iter().filter_map(|e| e.embedding.as_ref()) {
            VectorStoreError::check_dimensions(dimensions, supplied.len())?;
        }

        let missing: Vec<String> = input
            .embeddings
            .iter()
            .filter(|e| e.embedding.is_none())
            .map(|e| e.content.clone())
            .collect();

        let mut generated = if missing.is_empty() {
            Vec::new().into_iter()
        } else {
            let provider = self.provider("embeddings")?;
            self.require_store(store_id).await?;
            let output = self.gateway(provider.embed_batch(&missing)).await?;
            if output.vectors.len() != missing.len() {
                return Err(VectorStoreError::Gateway(format!(
                    "expected {} embeddings, gateway returned {}",
                    missing.len(),
                    output.vectors.len()
                )));
            }
            for vector in &output.vectors {
                self.check_gateway_vector(vector)?;
            }
            output.vectors.into_iter()
        };

        let mut items = Vec::with_capacity(input.embeddings.len());
        for request in input.embeddings {
            let embedding = match request.embedding {
                Some(vector) => vector,
                None => generated.next().ok_or_else(|| {
                    VectorStoreError::Gateway("gateway returned too few embeddings".to_string())
                })?,
            };
            items.push(NewEmbedding {
                content: request.content,
                embedding,
                metadata: request.metadata.unwrap_or_default(),
            });
        }

        let inserted = self
            .storage(
                "insert_embedding_batch",
                self.embeddings.insert_batch(store_id, items),
            )
            .await?;
        Ok(EmbeddingBatchObject::new(inserted))
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(has_vector = input.query_vector.is_some()))]
    pub async fn search(
        &self,
        store_id: &str,
        input: SearchRequest,
    ) -> VectorStoreResult<SearchResponse> {
        let limit = self.ranking.resolve_limit(input.limit)?;

        let (vector, total_tokens) = match (input.query_vector, input.query) {
            (Some(vector), _) => {
                VectorStoreError::check_dimensions(self.embeddings.dimensions(), vector.len())?;
                (vector, 0)
            }
            (None, Some(query)) if !query.trim().is_empty() => {
                let provider = self.provider("query")?;
                self.require_store(store_id).await?;
                let output = self.gateway(provider.embed(&query)).await?;
                self.check_gateway_vector(&output.vector)?;
                (output.vector, output.tokens)
            }
            (None, Some(_)) => {
                return Err(VectorStoreError::invalid_param(
                    "query",
                    "query must not be empty",
                ));
            }
            (None, None) => {
                return Err(VectorStoreError::validation(
                    "either query or query_vector is required",
                ));
            }
        };

        let query = SearchQuery {
            vector,
            limit,
            filter: input.filters.into(),
        };
        let hits = self
            .storage("search", self.embeddings.search(store_id, query))
            .await?;

        tracing::debug!(vector_store_id = %store_id, results = hits.len(), "Search completed");
        Ok(SearchResponse::new(hits, input.return_metadata, total_tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingBatchOutput, EmbeddingOutput, MockEmbeddingProvider};
    use crate::models::{Embedding, Metadata, NewVectorStore, Page, SearchHit, now};
    use crate::repository::{MockEmbeddingRepository, MockVectorStoreRepository};
    use async_trait::async_trait;
    use serde_json::json;

    fn store(id: &str) -> VectorStore {
        let mut store = VectorStore::new(NewVectorStore {
            name: "docs".to_string(),
            metadata: Metadata::new(),
            expires_after: None,
        });
        store.id = id.to_string();
        store
    }

    fn embeddings_with_dims(dims: usize) -> MockEmbeddingRepository {
        let mut repo = MockEmbeddingRepository::new();
        repo.expect_dimensions().return_const(dims);
        repo
    }

    fn service(
        stores: MockVectorStoreRepository,
        embeddings: MockEmbeddingRepository,
        provider: Option<MockEmbeddingProvider>,
    ) -> VectorStoreService {
        let service = VectorStoreService::new(
            Arc::new(stores),
            Arc::new(embeddings),
            RankingEngine::default(),
        );
        match provider {
            Some(p) => service.with_provider(Arc::new(p), Duration::from_secs(5)),
            None => service,
        }
    }

    fn search_request(value: serde_json::Value) -> SearchRequest {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_search_with_vector_skips_gateway() {
        let mut embeddings = embeddings_with_dims(3);
        embeddings
            .expect_search()
            .withf(|id, query| id == "vs_1" && query.limit == 2)
            .times(1)
            .returning(|_, _| {
                Ok(vec![SearchHit {
                    id: "emb_1".to_string(),
                    content: "hello".to_string(),
                    metadata: Metadata::new(),
                    created_at: now(),
                    score: 0.9,
                }])
            });
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_embed().never();

        let service = service(MockVectorStoreRepository::new(), embeddings, Some(provider));
        let response = service
            .search(
                "vs_1",
                search_request(json!({ "query_vector": [1.0, 0.0, 0.0], "limit": 2 })),
            )
            .await
            .unwrap();

        assert_eq!(response.data.len(), 1);
        assert_eq!(response.usage.total_tokens, 0);
    }

    #[tokio::test]
    async fn test_search_with_text_reports_gateway_tokens() {
        let mut stores = MockVectorStoreRepository::new();
        stores
            .expect_get()
            .returning(|id| Ok(Some(store(id))));
        let mut embeddings = embeddings_with_dims(2);
        embeddings.expect_search().returning(|_, _| Ok(vec![]));
        let mut provider = MockEmbeddingProvider::new();
        provider
            .expect_embed()
            .withf(|text| text == "refund policy")
            .times(1)
            .returning(|_| {
                Ok(EmbeddingOutput {
                    vector: vec![0.1, 0.2],
                    tokens: 7,
                })
            });

        let service = service(stores, embeddings, Some(provider));
        let response = service
            .search("vs_1", search_request(json!({ "query": "refund policy" })))
            .await
            .unwrap();

        assert_eq!(response.usage.total_tokens, 7);
        assert_eq!(response.object, "vector_store.search");
    }

    #[tokio::test]
    async fn test_search_requires_query_or_vector() {
        let service = service(
            MockVectorStoreRepository::new(),
            embeddings_with_dims(2),
            None,
        );
        let result = service.search("vs_1", search_request(json!({}))).await;
        assert!(matches!(result, Err(VectorStoreError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_search_limit_above_max_is_rejected() {
        let mut embeddings = embeddings_with_dims(2);
        embeddings.expect_search().never();
        let service = service(MockVectorStoreRepository::new(), embeddings, None);

        let result = service
            .search(
                "vs_1",
                search_request(json!({ "query_vector": [1.0, 0.0], "max_num_results": 101 })),
            )
            .await;
        assert!(matches!(
            result,
            Err(VectorStoreError::Validation { param: Some(ref p), .. }) if p == "limit"
        ));
    }

    #[tokio::test]
    async fn test_search_dimension_mismatch() {
        let mut embeddings = embeddings_with_dims(3);
        embeddings.expect_search().never();
        let service = service(MockVectorStoreRepository::new(), embeddings, None);

        let result = service
            .search("vs_1", search_request(json!({ "query_vector": [1.0] })))
            .await;
        assert!(matches!(
            result,
            Err(VectorStoreError::DimensionMismatch {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_text_without_gateway_is_validation_error() {
        let service = service(
            MockVectorStoreRepository::new(),
            embeddings_with_dims(2),
            None,
        );
        let request: CreateEmbeddingRequest =
            serde_json::from_value(json!({ "content": "hello" })).unwrap();
        let result = service.create_embedding("vs_1", request).await;
        assert!(matches!(result, Err(VectorStoreError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_create_embedding_mismatch_never_inserts() {
        let mut embeddings = embeddings_with_dims(3);
        embeddings.expect_insert_one().never();
        let service = service(MockVectorStoreRepository::new(), embeddings, None);

        let request: CreateEmbeddingRequest =
            serde_json::from_value(json!({ "content": "hello", "embedding": [1.0, 2.0] }))
                .unwrap();
        let result = service.create_embedding("vs_1", request).await;
        assert!(matches!(
            result,
            Err(VectorStoreError::DimensionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_gateway_vector_of_wrong_width_is_gateway_error() {
        let mut stores = MockVectorStoreRepository::new();
        stores.expect_get().returning(|id| Ok(Some(store(id))));
        let mut embeddings = embeddings_with_dims(3);
        embeddings.expect_insert_one().never();
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_embed().returning(|_| {
            Ok(EmbeddingOutput {
                vector: vec![0.1],
                tokens: 1,
            })
        });

        let service = service(stores, embeddings, Some(provider));
        let request: CreateEmbeddingRequest =
            serde_json::from_value(json!({ "content": "hello" })).unwrap();
        let result = service.create_embedding("vs_1", request).await;
        assert!(matches!(result, Err(VectorStoreError::Gateway(_))));
    }

    #[tokio::test]
    async fn test_batch_embeds_only_missing_vectors_in_order() {
        let mut stores = MockVectorStoreRepository::new();
        stores.expect_get().returning(|id| Ok(Some(store(id))));
        let mut provider = MockEmbeddingProvider::new();
        provider
            .expect_embed_batch()
            .withf(|texts| texts.to_vec() == vec!["b".to_string(), "c".to_string()])
            .times(1)
            .returning(|_| {
                Ok(EmbeddingBatchOutput {
                    vectors: vec![vec![2.0, 2.0], vec![3.0, 3.0]],
                    total_tokens: 2,
                })
            });
        let mut embeddings = embeddings_with_dims(2);
        embeddings
            .expect_insert_batch()
            .withf(|_, items| {
                items.iter().map(|i| i.embedding[0]).collect::<Vec<_>>() == vec![2.0, 1.0, 3.0]
            })
            .times(1)
            .returning(|store_id, items| {
                let at = now();
                Ok(items
                    .into_iter()
                    .map(|item| Embedding::new(store_id, item, at))
                    .collect())
            });

        let service = service(stores, embeddings, Some(provider));
        let request: CreateEmbeddingBatchRequest = serde_json::from_value(json!({
            "embeddings": [
                { "content": "b" },
                { "content": "a", "embedding": [1.0, 1.0] },
                { "content": "c" }
            ]
        }))
        .unwrap();

        let batch = service.create_embedding_batch("vs_1", request).await.unwrap();
        assert_eq!(batch.object, "embedding.batch");
        assert_eq!(batch.data.len(), 3);
    }

    #[tokio::test]
    async fn test_batch_bad_item_stops_before_gateway() {
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_embed_batch().never();
        let mut embeddings = embeddings_with_dims(2);
        embeddings.expect_insert_batch().never();

        let service = service(MockVectorStoreRepository::new(), embeddings, Some(provider));
        let request: CreateEmbeddingBatchRequest = serde_json::from_value(json!({
            "embeddings": [
                { "content": "a" },
                { "content": "b", "embedding": [1.0, 1.0, 1.0] }
            ]
        }))
        .unwrap();

        let result = service.create_embedding_batch("vs_1", request).await;
        assert!(matches!(
            result,
            Err(VectorStoreError::DimensionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_limit_bounds() {
        let mut stores = MockVectorStoreRepository::new();
        stores.expect_list().never();
        let service = service(stores, embeddings_with_dims(2), None);

        for limit in [0, 101] {
            let result = service
                .list_vector_stores(ListVectorStoresQuery {
                    limit: Some(limit),
                    ..Default::default()
                })
                .await;
            assert!(matches!(result, Err(VectorStoreError::Validation { .. })));
        }
    }

    #[tokio::test]
    async fn test_list_envelope_ids() {
        let mut stores = MockVectorStoreRepository::new();
        stores
            .expect_list()
            .withf(|params| params.limit == 2 && params.after.is_none())
            .returning(|_| {
                Ok(Page {
                    items: vec![store("vs_b"), store("vs_a")],
                    has_more: true,
                })
            });
        let service = service(stores, embeddings_with_dims(2), None);

        let list = service
            .list_vector_stores(ListVectorStoresQuery {
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(list.object, "list");
        assert_eq!(list.first_id.as_deref(), Some("vs_b"));
        assert_eq!(list.last_id.as_deref(), Some("vs_a"));
        assert!(list.has_more);
    }

    #[tokio::test]
    async fn test_get_unknown_store_is_not_found() {
        let mut stores = MockVectorStoreRepository::new();
        stores.expect_get().returning(|_| Ok(None));
        let service = service(stores, embeddings_with_dims(2), None);

        let result = service.get_vector_store("vs_missing").await;
        assert!(matches!(result, Err(VectorStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let mut stores = MockVectorStoreRepository::new();
        stores.expect_create().never();
        let service = service(stores, embeddings_with_dims(2), None);

        let request: CreateVectorStoreRequest =
            serde_json::from_value(json!({ "name": "  " })).unwrap();
        let result = service.create_vector_store(request).await;
        assert!(matches!(
            result,
            Err(VectorStoreError::Validation { param: Some(ref p), .. }) if p == "name"
        ));
    }

    struct SlowStores;

    #[async_trait]
    impl VectorStoreRepository for SlowStores {
        async fn create(&self, _: NewVectorStore) -> VectorStoreResult<VectorStore> {
            unimplemented!()
        }

        async fn get(&self, _: &str) -> VectorStoreResult<Option<VectorStore>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }

        async fn list(&self, _: ListParams) -> VectorStoreResult<Page<VectorStore>> {
            unimplemented!()
        }

        async fn update(
            &self,
            _: &str,
            _: crate::models::VectorStoreChanges,
        ) -> VectorStoreResult<VectorStore> {
            unimplemented!()
        }

        async fn increment_usage(&self, _: &str, _: i64, _: i64) -> VectorStoreResult<VectorStore> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn test_slow_storage_times_out() {
        let service = VectorStoreService::new(
            Arc::new(SlowStores),
            Arc::new(embeddings_with_dims(2)),
            RankingEngine::default(),
        )
        .with_storage_timeout(Duration::from_millis(20));

        let result = service.get_vector_store("vs_1").await;
        let err = result.unwrap_err();
        assert!(matches!(err, VectorStoreError::StorageTimeout(_)));
        assert!(err.is_retryable());
    }
}

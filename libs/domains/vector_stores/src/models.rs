use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Open JSON object attached to stores and embeddings.
pub type Metadata = Map<String, Value>;

pub const VECTOR_STORE_ID_PREFIX: &str = "vs_";
pub const EMBEDDING_ID_PREFIX: &str = "emb_";
pub const DEFAULT_LIST_LIMIT: u64 = 20;
pub const MAX_LIST_LIMIT: u64 = 100;

pub fn new_vector_store_id() -> String {
    format!("{}{}", VECTOR_STORE_ID_PREFIX, Uuid::now_v7().simple())
}

pub fn new_embedding_id() -> String {
    format!("{}{}", EMBEDDING_ID_PREFIX, Uuid::now_v7().simple())
}

/// Current time at the precision Postgres stores (microseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        let mut err = validator::ValidationError::new("blank");
        err.message = Some("must not be empty".into());
        return Err(err);
    }
    Ok(())
}

// ============================================================================
// Domain types
// ============================================================================

/// Per-state item counters of a store. `total` is derived, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileCounts {
    pub in_progress: i64,
    pub completed: i64,
    pub failed: i64,
    pub cancelled: i64,
}

impl FileCounts {
    pub fn total(&self) -> i64 {
        self.in_progress + self.completed + self.failed + self.cancelled
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VectorStoreStatus {
    InProgress,
    Completed,
    Expired,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ExpiresAfterAnchor {
    #[default]
    #[serde(rename = "last_active_at")]
    LastActiveAt,
}

/// Expiration policy: the store expires `days` after it was last active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ExpiresAfter {
    pub anchor: ExpiresAfterAnchor,
    #[validate(range(min = 1, max = 365, message = "must be between 1 and 365"))]
    pub days: u32,
}

impl ExpiresAfter {
    pub fn deadline_from(&self, anchor_time: DateTime<Utc>) -> DateTime<Utc> {
        anchor_time + Duration::days(i64::from(self.days))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorStore {
    pub id: String,
    pub name: String,
    pub usage_bytes: i64,
    pub file_counts: FileCounts,
    pub created_at: DateTime<Utc>,
    pub expires_after: Option<ExpiresAfter>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_active_at: Option<DateTime<Utc>>,
    pub metadata: Metadata,
}

impl VectorStore {
    /// Builds a fresh store: zero counters, active as of creation.
    pub fn new(input: NewVectorStore) -> Self {
        let created_at = now();
        let expires_at = input
            .expires_after
            .as_ref()
            .map(|policy| policy.deadline_from(created_at));

        Self {
            id: new_vector_store_id(),
            name: input.name,
            usage_bytes: 0,
            file_counts: FileCounts::default(),
            created_at,
            expires_after: input.expires_after,
            expires_at,
            last_active_at: Some(created_at),
            metadata: input.metadata,
        }
    }

    pub fn status(&self) -> VectorStoreStatus {
        self.status_at(Utc::now())
    }

    pub fn status_at(&self, at: DateTime<Utc>) -> VectorStoreStatus {
        if self.expires_at.is_some_and(|expires_at| expires_at <= at) {
            VectorStoreStatus::Expired
        } else if self.file_counts.in_progress > 0 {
            VectorStoreStatus::InProgress
        } else {
            VectorStoreStatus::Completed
        }
    }

    /// Moves `last_active_at` and re-anchors `expires_at` on it.
    pub fn mark_active(&mut self, at: DateTime<Utc>) {
        self.last_active_at = Some(at);
        if let Some(policy) = &self.expires_after {
            self.expires_at = Some(policy.deadline_from(at));
        }
    }

    /// Applies `changes` in place. A new policy is anchored on `last_active_at`.
    pub fn apply_changes(&mut self, changes: VectorStoreChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(metadata) = changes.metadata {
            self.metadata = metadata;
        }
        if let Some(policy) = changes.expires_after {
            let anchor = self.last_active_at.unwrap_or(self.created_at);
            self.expires_at = Some(policy.deadline_from(anchor));
            self.expires_after = Some(policy);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVectorStore {
    pub name: String,
    pub metadata: Metadata,
    pub expires_after: Option<ExpiresAfter>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorStoreChanges {
    pub name: Option<String>,
    pub metadata: Option<Metadata>,
    pub expires_after: Option<ExpiresAfter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub id: String,
    pub vector_store_id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl Embedding {
    pub fn new(vector_store_id: &str, input: NewEmbedding, created_at: DateTime<Utc>) -> Self {
        Self {
            id: new_embedding_id(),
            vector_store_id: vector_store_id.to_string(),
            content: input.content,
            embedding: input.embedding,
            metadata: input.metadata,
            created_at,
        }
    }
}

/// An embedding whose vector has already been resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmbedding {
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
}

impl NewEmbedding {
    pub fn content_bytes(&self) -> i64 {
        self.content.len() as i64
    }
}

/// One ranked search result. Scores are already normalized to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub score: f32,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub limit: u64,
    pub after: Option<String>,
    pub order: SortOrder,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            after: None,
            order: SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateVectorStoreRequest {
    #[validate(custom(function = "validate_not_blank"), length(max = 256))]
    pub name: String,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Metadata>,
    #[validate(nested)]
    pub expires_after: Option<ExpiresAfter>,
    /// Accepted for compatibility; ignored.
    #[serde(default)]
    pub file_ids: Option<Vec<String>>,
    /// Accepted for compatibility; ignored.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub chunking_strategy: Option<Value>,
}

impl From<CreateVectorStoreRequest> for NewVectorStore {
    fn from(req: CreateVectorStoreRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            metadata: req.metadata.unwrap_or_default(),
            expires_after: req.expires_after,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ModifyVectorStoreRequest {
    #[validate(custom(function = "validate_not_blank"), length(max = 256))]
    pub name: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Metadata>,
    #[validate(nested)]
    pub expires_after: Option<ExpiresAfter>,
}

impl From<ModifyVectorStoreRequest> for VectorStoreChanges {
    fn from(req: ModifyVectorStoreRequest) -> Self {
        Self {
            name: req.name.map(|name| name.trim().to_string()),
            metadata: req.metadata,
            expires_after: req.expires_after,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListVectorStoresQuery {
    /// Page size, 1 to 100 (default 20)
    pub limit: Option<u64>,
    /// Id of the last store on the previous page
    pub after: Option<String>,
    /// Sort by creation time (default `desc`)
    pub order: Option<SortOrder>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateEmbeddingRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub content: String,
    /// Precomputed vector; embedded from `content` when absent
    pub embedding: Option<Vec<f32>>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEmbeddingBatchRequest {
    #[validate(length(min = 1, message = "must contain at least one item"), nested)]
    pub embeddings: Vec<CreateEmbeddingRequest>,
}

fn default_return_metadata() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SearchRequest {
    /// Text to embed and search with
    pub query: Option<String>,
    /// Precomputed query vector; takes precedence over `query`
    pub query_vector: Option<Vec<f32>>,
    #[serde(alias = "max_num_results")]
    pub limit: Option<u64>,
    /// Exact-match metadata conjunction
    #[schema(value_type = Option<Object>)]
    pub filters: Option<Metadata>,
    #[serde(default = "default_return_metadata")]
    pub return_metadata: bool,
}

// ============================================================================
// Response envelopes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileCountsObject {
    pub in_progress: i64,
    pub completed: i64,
    pub failed: i64,
    pub cancelled: i64,
    pub total: i64,
}

impl From<FileCounts> for FileCountsObject {
    fn from(counts: FileCounts) -> Self {
        Self {
            in_progress: counts.in_progress,
            completed: counts.completed,
            failed: counts.failed,
            cancelled: counts.cancelled,
            total: counts.total(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VectorStoreObject {
    pub id: String,
    /// Always `vector_store`
    pub object: String,
    /// Unix seconds
    pub created_at: i64,
    pub name: String,
    pub usage_bytes: i64,
    pub file_counts: FileCountsObject,
    pub status: VectorStoreStatus,
    pub expires_after: Option<ExpiresAfter>,
    pub expires_at: Option<i64>,
    pub last_active_at: Option<i64>,
    #[schema(value_type = Object)]
    pub metadata: Metadata,
}

impl From<VectorStore> for VectorStoreObject {
    fn from(store: VectorStore) -> Self {
        Self {
            status: store.status(),
            id: store.id,
            object: "vector_store".to_string(),
            created_at: store.created_at.timestamp(),
            name: store.name,
            usage_bytes: store.usage_bytes,
            file_counts: store.file_counts.into(),
            expires_after: store.expires_after,
            expires_at: store.expires_at.map(|t| t.timestamp()),
            last_active_at: store.last_active_at.map(|t| t.timestamp()),
            metadata: store.metadata,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VectorStoreList {
    /// Always `list`
    pub object: String,
    pub data: Vec<VectorStoreObject>,
    pub first_id: Option<String>,
    pub last_id: Option<String>,
    pub has_more: bool,
}

impl From<Page<VectorStore>> for VectorStoreList {
    fn from(page: Page<VectorStore>) -> Self {
        let data: Vec<VectorStoreObject> = page.items.into_iter().map(Into::into).collect();
        Self {
            object: "list".to_string(),
            first_id: data.first().map(|s| s.id.clone()),
            last_id: data.last().map(|s| s.id.clone()),
            has_more: page.has_more,
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmbeddingObject {
    pub id: String,
    /// Always `embedding`
    pub object: String,
    pub vector_store_id: String,
    pub content: String,
    #[schema(value_type = Object)]
    pub metadata: Metadata,
    /// Unix seconds
    pub created_at: i64,
}

impl From<Embedding> for EmbeddingObject {
    fn from(embedding: Embedding) -> Self {
        Self {
            id: embedding.id,
            object: "embedding".to_string(),
            vector_store_id: embedding.vector_store_id,
            content: embedding.content,
            metadata: embedding.metadata,
            created_at: embedding.created_at.timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmbeddingBatchObject {
    /// Always `embedding.batch`
    pub object: String,
    pub data: Vec<EmbeddingObject>,
    /// Unix seconds
    pub created: i64,
}

impl EmbeddingBatchObject {
    pub fn new(embeddings: Vec<Embedding>) -> Self {
        let created = embeddings
            .first()
            .map(|e| e.created_at.timestamp())
            .unwrap_or_else(|| now().timestamp());
        Self {
            object: "embedding.batch".to_string(),
            data: embeddings.into_iter().map(Into::into).collect(),
            created,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResultObject {
    pub id: String,
    pub content: String,
    /// Similarity normalized to `[0, 1]`
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SearchUsage {
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    /// Always `vector_store.search`
    pub object: String,
    pub data: Vec<SearchResultObject>,
    pub usage: SearchUsage,
}

impl SearchResponse {
    pub fn new(hits: Vec<SearchHit>, return_metadata: bool, total_tokens: u32) -> Self {
        let data = hits
            .into_iter()
            .map(|hit| SearchResultObject {
                id: hit.id,
                content: hit.content,
                score: hit.score,
                metadata: return_metadata.then_some(hit.metadata),
            })
            .collect();
        Self {
            object: "vector_store.search".to_string(),
            data,
            usage: SearchUsage { total_tokens },
        }
    }
}

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::{
    AppError, IdPrefix, PrefixedId, ValidatedJson,
    errors::responses::{
        BadRequestResponse, GatewayErrorResponse, InternalServerErrorResponse, NotFoundResponse,
        UnauthorizedResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::VectorStoreResult;
use crate::models::{
    CreateEmbeddingBatchRequest, CreateEmbeddingRequest, CreateVectorStoreRequest,
    EmbeddingBatchObject, EmbeddingObject, ExpiresAfter, ExpiresAfterAnchor, FileCountsObject,
    ListVectorStoresQuery, ModifyVectorStoreRequest, SearchRequest, SearchResponse,
    SearchResultObject, SearchUsage, SortOrder, VECTOR_STORE_ID_PREFIX, VectorStoreList,
    VectorStoreObject, VectorStoreStatus,
};
use crate::service::VectorStoreService;

pub const TAG: &str = "vector_stores";

/// Path marker for `vs_` ids.
pub struct VectorStoreIdPrefix;

impl IdPrefix for VectorStoreIdPrefix {
    const PREFIX: &'static str = VECTOR_STORE_ID_PREFIX;
    const RESOURCE: &'static str = "vector store";
}

type StoreId = PrefixedId<VectorStoreIdPrefix>;

/// OpenAPI documentation for the Vector Stores API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_vector_stores,
        create_vector_store,
        get_vector_store,
        modify_vector_store,
        create_embedding,
        create_embedding_batch,
        search_vector_store,
    ),
    components(
        schemas(
            VectorStoreObject,
            VectorStoreList,
            VectorStoreStatus,
            FileCountsObject,
            ExpiresAfter,
            ExpiresAfterAnchor,
            SortOrder,
            CreateVectorStoreRequest,
            ModifyVectorStoreRequest,
            CreateEmbeddingRequest,
            CreateEmbeddingBatchRequest,
            EmbeddingObject,
            EmbeddingBatchObject,
            SearchRequest,
            SearchResponse,
            SearchResultObject,
            SearchUsage,
        ),
        responses(
            BadRequestResponse,
            UnauthorizedResponse,
            NotFoundResponse,
            GatewayErrorResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "Vector stores, embeddings and similarity search")
    )
)]
pub struct ApiDoc;

/// Create the vector store router with all HTTP endpoints
pub fn router(service: VectorStoreService) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route(
            "/vector_stores",
            get(list_vector_stores).post(create_vector_store),
        )
        .route(
            "/vector_stores/{id}",
            get(get_vector_store).post(modify_vector_store),
        )
        .route("/vector_stores/{id}/embeddings", post(create_embedding))
        .route(
            "/vector_stores/{id}/embeddings/batch",
            post(create_embedding_batch),
        )
        .route("/vector_stores/{id}/search", post(search_vector_store))
        .with_state(shared_service)
}

/// List vector stores, newest first by default
#[utoipa::path(
    get,
    path = "/vector_stores",
    tag = TAG,
    params(ListVectorStoresQuery),
    responses(
        (status = 200, description = "Page of vector stores", body = VectorStoreList),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_vector_stores(
    State(service): State<Arc<VectorStoreService>>,
    query: Result<Query<ListVectorStoresQuery>, QueryRejection>,
) -> Result<Json<VectorStoreList>, AppError> {
    let Query(query) = query.map_err(|e| AppError::bad_request(e.body_text()))?;
    let list = service.list_vector_stores(query).await?;
    Ok(Json(list))
}

/// Create a vector store
#[utoipa::path(
    post,
    path = "/vector_stores",
    tag = TAG,
    request_body = CreateVectorStoreRequest,
    responses(
        (status = 201, description = "Vector store created", body = VectorStoreObject),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_vector_store(
    State(service): State<Arc<VectorStoreService>>,
    ValidatedJson(input): ValidatedJson<CreateVectorStoreRequest>,
) -> VectorStoreResult<impl IntoResponse> {
    let store = service.create_vector_store(input).await?;
    tracing::info!(vector_store_id = %store.id, "Vector store created");
    Ok((StatusCode::CREATED, Json(store)))
}

/// Get a vector store by ID
#[utoipa::path(
    get,
    path = "/vector_stores/{id}",
    tag = TAG,
    params(
        ("id" = String, Path, description = "Vector store ID (vs_...)")
    ),
    responses(
        (status = 200, description = "Vector store found", body = VectorStoreObject),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_vector_store(
    State(service): State<Arc<VectorStoreService>>,
    PrefixedId(id, _): StoreId,
) -> VectorStoreResult<Json<VectorStoreObject>> {
    let store = service.get_vector_store(&id).await?;
    Ok(Json(store))
}

/// Modify a vector store's name, metadata or expiration policy
#[utoipa::path(
    post,
    path = "/vector_stores/{id}",
    tag = TAG,
    params(
        ("id" = String, Path, description = "Vector store ID (vs_...)")
    ),
    request_body = ModifyVectorStoreRequest,
    responses(
        (status = 200, description = "Vector store updated", body = VectorStoreObject),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn modify_vector_store(
    State(service): State<Arc<VectorStoreService>>,
    PrefixedId(id, _): StoreId,
    ValidatedJson(input): ValidatedJson<ModifyVectorStoreRequest>,
) -> VectorStoreResult<Json<VectorStoreObject>> {
    let store = service.modify_vector_store(&id, input).await?;
    Ok(Json(store))
}

/// Add one embedding to a vector store
#[utoipa::path(
    post,
    path = "/vector_stores/{id}/embeddings",
    tag = TAG,
    params(
        ("id" = String, Path, description = "Vector store ID (vs_...)")
    ),
    request_body = CreateEmbeddingRequest,
    responses(
        (status = 201, description = "Embedding stored", body = EmbeddingObject),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 502, response = GatewayErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_embedding(
    State(service): State<Arc<VectorStoreService>>,
    PrefixedId(id, _): StoreId,
    ValidatedJson(input): ValidatedJson<CreateEmbeddingRequest>,
) -> VectorStoreResult<impl IntoResponse> {
    let embedding = service.create_embedding(&id, input).await?;
    Ok((StatusCode::CREATED, Json(embedding)))
}

/// Add many embeddings atomically
#[utoipa::path(
    post,
    path = "/vector_stores/{id}/embeddings/batch",
    tag = TAG,
    params(
        ("id" = String, Path, description = "Vector store ID (vs_...)")
    ),
    request_body = CreateEmbeddingBatchRequest,
    responses(
        (status = 201, description = "All embeddings stored", body = EmbeddingBatchObject),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 502, response = GatewayErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_embedding_batch(
    State(service): State<Arc<VectorStoreService>>,
    PrefixedId(id, _): StoreId,
    ValidatedJson(input): ValidatedJson<CreateEmbeddingBatchRequest>,
) -> VectorStoreResult<impl IntoResponse> {
    let batch = service.create_embedding_batch(&id, input).await?;
    tracing::info!(vector_store_id = %id, count = batch.data.len(), "Embedding batch stored");
    Ok((StatusCode::CREATED, Json(batch)))
}

/// Similarity search within one vector store
#[utoipa::path(
    post,
    path = "/vector_stores/{id}/search",
    tag = TAG,
    params(
        ("id" = String, Path, description = "Vector store ID (vs_...)")
    ),
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Ranked results", body = SearchResponse),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 502, response = GatewayErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn search_vector_store(
    State(service): State<Arc<VectorStoreService>>,
    PrefixedId(id, _): StoreId,
    ValidatedJson(input): ValidatedJson<SearchRequest>,
) -> VectorStoreResult<Json<SearchResponse>> {
    let results = service.search(&id, input).await?;
    Ok(Json(results))
}

//! Integration tests for the vector stores domain
//!
//! These run against a real pgvector PostgreSQL via testcontainers:
//! - keyset pagination over `(created_at, id)`
//! - counter updates in the same transaction as inserts
//! - rollback of a batch that fails midway
//! - a custom embeddings table reached through the field mapping
//!
//! They need a Docker daemon, so they are ignored by default:
//! `cargo test -p domain_vector_stores -- --ignored`

use domain_vector_stores::models::{ListParams, NewEmbedding, NewVectorStore, SortOrder};
use domain_vector_stores::repository::SearchQuery;
use domain_vector_stores::*;
use serde_json::json;
use std::sync::Arc;
use test_utils::{TestDataBuilder, TestDatabase, assertions::*};

const DIMS: usize = 8;

fn repos(db: &TestDatabase, fields: FieldMap) -> (PgVectorStoreRepository, PgEmbeddingRepository) {
    let ranking = RankingEngine::default();
    (
        PgVectorStoreRepository::new(db.connection()),
        PgEmbeddingRepository::new(
            db.connection(),
            Arc::new(fields),
            ranking,
            DIMS,
            &StorageConfig {
                insert_chunk_size: 2,
                ..Default::default()
            },
        ),
    )
}

fn new_store(name: String) -> NewVectorStore {
    NewVectorStore {
        name,
        metadata: json!({ "suite": "integration" }).as_object().cloned().unwrap(),
        expires_after: None,
    }
}

fn item(content: &str, embedding: Vec<f32>, category: &str) -> NewEmbedding {
    NewEmbedding {
        content: content.to_string(),
        embedding,
        metadata: json!({ "category": category }).as_object().cloned().unwrap(),
    }
}

// ============================================================================
// Store repository
// ============================================================================

#[tokio::test]
#[ignore = "requires docker"]
async fn test_create_and_get_store() {
    let db = TestDatabase::new().await;
    let (stores, _) = repos(&db, FieldMap::default());
    let builder = TestDataBuilder::from_test_name("create_and_get");

    let created = stores.create(new_store(builder.name("store", "main"))).await.unwrap();
    let fetched = assert_some(stores.get(&created.id).await.unwrap(), "store should exist");

    assert_eq!(fetched, created);
    assert_eq!(fetched.metadata["suite"], "integration");
    assert!(stores.get("vs_missing").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_pagination_partitions_all_stores() {
    let db = TestDatabase::new().await;
    let (stores, _) = repos(&db, FieldMap::default());
    let builder = TestDataBuilder::from_test_name("pagination");

    let mut created = Vec::new();
    for i in 0..5 {
        let store = stores
            .create(new_store(builder.name("store", &i.to_string())))
            .await
            .unwrap();
        created.push(store.id);
    }

    for order in [SortOrder::Desc, SortOrder::Asc] {
        let mut seen = Vec::new();
        let mut after = None;
        loop {
            let page = stores
                .list(ListParams {
                    limit: 2,
                    after: after.clone(),
                    order,
                })
                .await
                .unwrap();
            seen.extend(page.items.iter().map(|s| s.id.clone()));
            if !page.has_more {
                break;
            }
            after = page.items.last().map(|s| s.id.clone());
        }

        let mut expected = created.clone();
        if order == SortOrder::Desc {
            expected.reverse();
        }
        assert_eq!(seen, expected, "order {:?}", order);
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_unknown_cursor_is_validation_error() {
    let db = TestDatabase::new().await;
    let (stores, _) = repos(&db, FieldMap::default());

    let result = stores
        .list(ListParams {
            after: Some("vs_nope".to_string()),
            ..Default::default()
        })
        .await;
    assert!(matches!(result, Err(VectorStoreError::Validation { .. })));
}

// ============================================================================
// Embedding repository
// ============================================================================

#[tokio::test]
#[ignore = "requires docker"]
async fn test_batch_insert_updates_counters_and_search_ranks() {
    let db = TestDatabase::new().await;
    let (stores, embeddings) = repos(&db, FieldMap::default());
    let builder = TestDataBuilder::from_test_name("batch_counters");

    let store = stores.create(new_store(builder.name("store", "faq"))).await.unwrap();
    let items = vec![
        item("reset password", builder.vector(DIMS, 0), "support"),
        item("refund window", builder.vector(DIMS, 1), "billing"),
        item("contact us", builder.noise_vector(DIMS, 7), "support"),
    ];
    let expected_bytes: i64 = items.iter().map(|i| i.content.len() as i64).sum();

    let inserted = embeddings.insert_batch(&store.id, items).await.unwrap();
    assert_eq!(inserted.len(), 3);

    let store = stores.get(&store.id).await.unwrap().unwrap();
    assert_eq!(store.file_counts.completed, 3);
    assert_eq!(store.usage_bytes, expected_bytes);

    let hits = embeddings
        .search(
            &store.id,
            SearchQuery {
                vector: builder.vector(DIMS, 0),
                limit: 10,
                filter: Default::default(),
            },
        )
        .await
        .unwrap();
    assert_eq!(hits[0].id, inserted[0].id);
    assert_close(hits[0].score, 1.0, 1e-5, "self similarity");
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));

    let filtered = embeddings
        .search(
            &store.id,
            SearchQuery {
                vector: builder.vector(DIMS, 0),
                limit: 10,
                filter: Some(json!({ "category": "support" }).as_object().cloned().unwrap())
                    .into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(filtered.len(), 2);
    assert!(filtered.iter().all(|h| h.metadata["category"] == "support"));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_concurrent_inserts_keep_counters_exact() {
    let db = TestDatabase::new().await;
    let (stores, embeddings) = repos(&db, FieldMap::default());
    let builder = TestDataBuilder::from_test_name("concurrent_counters");
    let store = stores.create(new_store(builder.name("store", "hot"))).await.unwrap();

    let embeddings = Arc::new(embeddings);
    let mut handles = Vec::new();
    for i in 0..10u64 {
        let embeddings = embeddings.clone();
        let store_id = store.id.clone();
        let vector = builder.noise_vector(DIMS, i);
        handles.push(tokio::spawn(async move {
            embeddings
                .insert_one(&store_id, item("abcd", vector, "load"))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let store = stores.get(&store.id).await.unwrap().unwrap();
    assert_eq!(store.file_counts.completed, 10);
    assert_eq!(store.usage_bytes, 40);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_failed_batch_leaves_no_trace() {
    let db = TestDatabase::new().await;
    let (stores, embeddings) = repos(&db, FieldMap::default());
    let builder = TestDataBuilder::from_test_name("failed_batch");
    let store = stores.create(new_store(builder.name("store", "atomic"))).await.unwrap();

    // The last item is one component too wide
    let items = vec![
        item("one", builder.vector(DIMS, 0), "x"),
        item("two", builder.vector(DIMS, 1), "x"),
        item("three", builder.vector(DIMS + 1, 2), "x"),
    ];
    let result = embeddings.insert_batch(&store.id, items).await;
    assert!(matches!(
        result,
        Err(VectorStoreError::DimensionMismatch { .. })
    ));

    let store = stores.get(&store.id).await.unwrap().unwrap();
    assert_eq!(store.file_counts.completed, 0);
    assert_eq!(store.usage_bytes, 0);

    let hits = embeddings
        .search(
            &store.id,
            SearchQuery {
                vector: builder.vector(DIMS, 0),
                limit: 10,
                filter: Default::default(),
            },
        )
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_insert_into_unknown_store_is_not_found() {
    let db = TestDatabase::new().await;
    let (_, embeddings) = repos(&db, FieldMap::default());
    let builder = TestDataBuilder::from_test_name("unknown_store");

    let result = embeddings
        .insert_one("vs_missing", item("x", builder.vector(DIMS, 0), "x"))
        .await;
    assert!(matches!(result, Err(VectorStoreError::NotFound(_))));

    let result = embeddings
        .search(
            "vs_missing",
            SearchQuery {
                vector: builder.vector(DIMS, 0),
                limit: 1,
                filter: Default::default(),
            },
        )
        .await;
    assert!(matches!(result, Err(VectorStoreError::NotFound(_))));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_custom_field_mapping() {
    let db = TestDatabase::new().await;
    db.execute(
        r#"CREATE TABLE doc_chunks (
            chunk_id TEXT PRIMARY KEY,
            store_ref TEXT NOT NULL REFERENCES vector_stores (id),
            body TEXT NOT NULL,
            vec vector NOT NULL,
            attrs JSONB NOT NULL,
            inserted_at TIMESTAMPTZ NOT NULL
        )"#,
    )
    .await;

    let fields = FieldMap::new(FieldMappingConfig {
        id_field: "chunk_id".to_string(),
        content_field: "body".to_string(),
        metadata_field: "attrs".to_string(),
        embedding_field: "vec".to_string(),
        vector_store_id_field: "store_ref".to_string(),
        created_at_field: "inserted_at".to_string(),
        embeddings_table: "doc_chunks".to_string(),
    })
    .unwrap();
    let (stores, embeddings) = repos(&db, fields);
    let builder = TestDataBuilder::from_test_name("custom_fields");
    let store = stores.create(new_store(builder.name("store", "mapped"))).await.unwrap();

    let inserted = embeddings
        .insert_one(&store.id, item("mapped row", builder.vector(DIMS, 3), "docs"))
        .await
        .unwrap();

    let hits = embeddings
        .search(
            &store.id,
            SearchQuery {
                vector: builder.vector(DIMS, 3),
                limit: 5,
                filter: Default::default(),
            },
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, inserted.id);
    assert_eq!(hits[0].content, "mapped row");
    assert_eq!(hits[0].metadata["category"], "docs");
}

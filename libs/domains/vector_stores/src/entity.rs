use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde_json::Value;

use crate::error::{VectorStoreError, VectorStoreResult};
use crate::models::{ExpiresAfter, FileCounts, Metadata, VectorStore};

/// Sea-ORM Entity for the vector_stores table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "vector_stores")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    pub usage_bytes: i64,
    pub file_counts_in_progress: i64,
    pub file_counts_completed: i64,
    pub file_counts_failed: i64,
    pub file_counts_cancelled: i64,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub expires_after: Option<Json>,
    pub expires_at: Option<DateTimeUtc>,
    pub last_active_at: Option<DateTimeUtc>,
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn metadata_from_json(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        _ => Metadata::new(),
    }
}

pub(crate) fn expires_after_to_json(
    policy: Option<&ExpiresAfter>,
) -> VectorStoreResult<Option<Json>> {
    policy
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| VectorStoreError::Storage(format!("failed to encode expires_after: {}", e)))
}

// Conversion from Sea-ORM Model to domain VectorStore
impl TryFrom<Model> for VectorStore {
    type Error = VectorStoreError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let expires_after = model
            .expires_after
            .map(serde_json::from_value::<ExpiresAfter>)
            .transpose()
            .map_err(|e| {
                VectorStoreError::Storage(format!(
                    "vector store {} has malformed expires_after: {}",
                    model.id, e
                ))
            })?;

        Ok(Self {
            id: model.id,
            name: model.name,
            usage_bytes: model.usage_bytes,
            file_counts: FileCounts {
                in_progress: model.file_counts_in_progress,
                completed: model.file_counts_completed,
                failed: model.file_counts_failed,
                cancelled: model.file_counts_cancelled,
            },
            created_at: model.created_at,
            expires_after,
            expires_at: model.expires_at,
            last_active_at: model.last_active_at,
            metadata: metadata_from_json(model.metadata),
        })
    }
}

// Conversion from a freshly built domain VectorStore to an insertable ActiveModel
impl TryFrom<&VectorStore> for ActiveModel {
    type Error = VectorStoreError;

    fn try_from(store: &VectorStore) -> Result<Self, Self::Error> {
        Ok(ActiveModel {
            id: Set(store.id.clone()),
            name: Set(store.name.clone()),
            usage_bytes: Set(store.usage_bytes),
            file_counts_in_progress: Set(store.file_counts.in_progress),
            file_counts_completed: Set(store.file_counts.completed),
            file_counts_failed: Set(store.file_counts.failed),
            file_counts_cancelled: Set(store.file_counts.cancelled),
            expires_after: Set(expires_after_to_json(store.expires_after.as_ref())?),
            expires_at: Set(store.expires_at),
            last_active_at: Set(store.last_active_at),
            metadata: Set(Value::Object(store.metadata.clone())),
            created_at: Set(store.created_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExpiresAfterAnchor, NewVectorStore, now};
    use serde_json::json;

    #[test]
    fn test_model_to_domain() {
        let created_at = now();
        let model = Model {
            id: "vs_1".to_string(),
            name: "docs".to_string(),
            usage_bytes: 42,
            file_counts_in_progress: 0,
            file_counts_completed: 2,
            file_counts_failed: 1,
            file_counts_cancelled: 0,
            expires_after: Some(json!({ "anchor": "last_active_at", "days": 3 })),
            expires_at: None,
            last_active_at: Some(created_at),
            metadata: json!({ "team": "support" }),
            created_at,
        };

        let store = VectorStore::try_from(model).unwrap();
        assert_eq!(store.file_counts.total(), 3);
        assert_eq!(store.expires_after.map(|p| p.days), Some(3));
        assert_eq!(store.metadata["team"], "support");
    }

    #[test]
    fn test_malformed_policy_is_storage_error() {
        let model = Model {
            id: "vs_1".to_string(),
            name: "docs".to_string(),
            usage_bytes: 0,
            file_counts_in_progress: 0,
            file_counts_completed: 0,
            file_counts_failed: 0,
            file_counts_cancelled: 0,
            expires_after: Some(json!({ "days": "soon" })),
            expires_at: None,
            last_active_at: None,
            metadata: json!({}),
            created_at: now(),
        };
        assert!(matches!(
            VectorStore::try_from(model),
            Err(VectorStoreError::Storage(_))
        ));
    }

    #[test]
    fn test_domain_to_active_model() {
        let store = VectorStore::new(NewVectorStore {
            name: "docs".to_string(),
            metadata: Metadata::new(),
            expires_after: Some(ExpiresAfter {
                anchor: ExpiresAfterAnchor::LastActiveAt,
                days: 2,
            }),
        });
        let active = ActiveModel::try_from(&store).unwrap();
        assert_eq!(
            active.expires_after,
            Set(Some(json!({ "anchor": "last_active_at", "days": 2 })))
        );
    }
}

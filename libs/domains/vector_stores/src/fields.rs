//! Logical-to-physical column mapping for the embeddings table.
//!
//! The mapping is resolved once at startup into a [`FieldMap`] and shared as
//! `Arc<FieldMap>`. Every identifier is validated when the map is built, so
//! SQL assembled from it only ever contains checked, double-quoted names.

use core_config::{ConfigError, FromEnv, env_or_default};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use strum::{Display, EnumIter, IntoEnumIterator};

static SQL_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid regex"));

/// Name of the store table. Not configurable.
pub const VECTOR_STORES_TABLE: &str = "vector_stores";

/// Logical fields of an embedding row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    Id,
    Content,
    Metadata,
    Embedding,
    VectorStoreId,
    CreatedAt,
}

impl Field {
    fn env_key(self) -> String {
        format!("DB_FIELDS__{}_FIELD", self.to_string().to_uppercase())
    }
}

/// Raw column names as configured, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMappingConfig {
    pub id_field: String,
    pub content_field: String,
    pub metadata_field: String,
    pub embedding_field: String,
    pub vector_store_id_field: String,
    pub created_at_field: String,
    pub embeddings_table: String,
}

impl Default for FieldMappingConfig {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            content_field: "content".to_string(),
            metadata_field: "metadata".to_string(),
            embedding_field: "embedding".to_string(),
            vector_store_id_field: "vector_store_id".to_string(),
            created_at_field: "created_at".to_string(),
            embeddings_table: "embeddings".to_string(),
        }
    }
}

impl FieldMappingConfig {
    fn get(&self, field: Field) -> &str {
        match field {
            Field::Id => &self.id_field,
            Field::Content => &self.content_field,
            Field::Metadata => &self.metadata_field,
            Field::Embedding => &self.embedding_field,
            Field::VectorStoreId => &self.vector_store_id_field,
            Field::CreatedAt => &self.created_at_field,
        }
    }
}

impl FromEnv for FieldMappingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let read = |field: Field| env_or_default(&field.env_key(), defaults.get(field));

        Ok(Self {
            id_field: read(Field::Id),
            content_field: read(Field::Content),
            metadata_field: read(Field::Metadata),
            embedding_field: read(Field::Embedding),
            vector_store_id_field: read(Field::VectorStoreId),
            created_at_field: read(Field::CreatedAt),
            embeddings_table: env_or_default("DB_FIELDS__EMBEDDINGS_TABLE", &defaults.embeddings_table),
        })
    }
}

/// Validated, immutable column mapping.
#[derive(Debug, Clone)]
pub struct FieldMap {
    config: FieldMappingConfig,
}

impl FieldMap {
    pub fn new(config: FieldMappingConfig) -> Result<Self, ConfigError> {
        check_identifier("DB_FIELDS__EMBEDDINGS_TABLE", &config.embeddings_table)?;

        let mut seen = HashSet::new();
        for field in Field::iter() {
            let column = config.get(field);
            check_identifier(&field.env_key(), column)?;
            if !seen.insert(column.to_ascii_lowercase()) {
                return Err(ConfigError::Invalid {
                    key: field.env_key(),
                    details: format!("column '{}' is mapped to more than one field", column),
                });
            }
        }

        Ok(Self { config })
    }

    /// Physical column name for `field`, unquoted.
    pub fn column(&self, field: Field) -> &str {
        self.config.get(field)
    }

    /// Physical column name for `field`, double-quoted for SQL.
    pub fn quoted(&self, field: Field) -> String {
        quote(self.column(field))
    }

    pub fn table(&self) -> &str {
        &self.config.embeddings_table
    }

    pub fn quoted_table(&self) -> String {
        quote(self.table())
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            config: FieldMappingConfig::default(),
        }
    }
}

fn check_identifier(key: &str, value: &str) -> Result<(), ConfigError> {
    if SQL_IDENTIFIER.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key: key.to_string(),
            details: format!("'{}' is not a valid SQL identifier", value),
        })
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

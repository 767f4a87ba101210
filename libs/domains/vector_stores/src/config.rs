//! Environment-driven settings for the vector store engine.

use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or};
use std::time::Duration;

use crate::ranking::{ScoreNormalization, SimilarityMetric};

/// Embedding gateway settings (`EMBEDDING__*`).
#[derive(Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub dimensions: usize,
    pub timeout: Duration,
    /// Forward `dimensions` in the request body (for models that support shortening).
    pub send_dimensions: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-ada-002".to_string(),
            base_url: "http://localhost:4000".to_string(),
            api_key: String::new(),
            dimensions: 1536,
            timeout: Duration::from_secs(30),
            send_dimensions: false,
        }
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("dimensions", &self.dimensions)
            .field("timeout", &self.timeout)
            .field("send_dimensions", &self.send_dimensions)
            .finish()
    }
}

impl FromEnv for EmbeddingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let dimensions = env_parse_or("EMBEDDING__DIMENSIONS", defaults.dimensions)?;
        if dimensions == 0 {
            return Err(ConfigError::Invalid {
                key: "EMBEDDING__DIMENSIONS".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            model: env_or_default("EMBEDDING__MODEL", &defaults.model),
            base_url: env_or_default("EMBEDDING__BASE_URL", &defaults.base_url),
            api_key: env_or_default("EMBEDDING__API_KEY", ""),
            dimensions,
            timeout: Duration::from_secs(env_parse_or("EMBEDDING__TIMEOUT_SECS", 30)?),
            send_dimensions: env_parse_or("EMBEDDING__SEND_DIMENSIONS", false)?,
        })
    }
}

/// Search defaults (`SEARCH__*`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    pub default_limit: u64,
    pub max_limit: u64,
    pub metric: SimilarityMetric,
    pub score_normalization: ScoreNormalization,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            metric: SimilarityMetric::Cosine,
            score_normalization: ScoreNormalization::Clamp,
        }
    }
}

impl FromEnv for SearchConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            default_limit: env_parse_or("SEARCH__DEFAULT_LIMIT", defaults.default_limit)?,
            max_limit: env_parse_or("SEARCH__MAX_LIMIT", defaults.max_limit)?,
            metric: env_parse_or("SEARCH__METRIC", defaults.metric)?,
            score_normalization: env_parse_or(
                "SEARCH__SCORE_NORMALIZATION",
                defaults.score_normalization,
            )?,
        };

        if config.default_limit == 0 || config.default_limit > config.max_limit {
            return Err(ConfigError::Invalid {
                key: "SEARCH__DEFAULT_LIMIT".to_string(),
                details: format!("must be between 1 and {}", config.max_limit),
            });
        }

        Ok(config)
    }
}

/// Storage deadlines and batching (`STORAGE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageConfig {
    /// Upper bound for any single repository call.
    pub timeout: Duration,
    /// Rows per multi-row `INSERT` inside a batch transaction.
    pub insert_chunk_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            insert_chunk_size: 500,
        }
    }
}

impl FromEnv for StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let insert_chunk_size = env_parse_or("STORAGE_INSERT_CHUNK_SIZE", 500usize)?;
        if insert_chunk_size == 0 {
            return Err(ConfigError::Invalid {
                key: "STORAGE_INSERT_CHUNK_SIZE".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            timeout: Duration::from_secs(env_parse_or("STORAGE_TIMEOUT_SECS", 30)?),
            insert_chunk_size,
        })
    }
}

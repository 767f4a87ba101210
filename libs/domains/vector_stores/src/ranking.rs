//! Similarity scoring and ordering.
//!
//! The same rules back two executions: [`RankingEngine::rank`] over in-memory
//! candidates, and the pgvector push-down in [`crate::postgres`], which
//! converts distances back to similarities via [`RankingEngine::score_distance`].
//!
//! Ordering is by raw similarity (before normalization) descending, then
//! `created_at` ascending, then `id` ascending.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::config::SearchConfig;
use crate::error::{VectorStoreError, VectorStoreResult};
use crate::models::{Embedding, Metadata, SearchHit};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    DotProduct,
    Euclidean,
}

impl SimilarityMetric {
    /// pgvector distance operator for this metric.
    pub fn operator(self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "<=>",
            SimilarityMetric::DotProduct => "<#>",
            SimilarityMetric::Euclidean => "<->",
        }
    }

    /// Raw similarity of two equal-length vectors. NaN when undefined.
    pub fn similarity(self, a: &[f32], b: &[f32]) -> f64 {
        let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
        match self {
            SimilarityMetric::Cosine => {
                let norm_a = norm(a);
                let norm_b = norm(b);
                if norm_a == 0.0 || norm_b == 0.0 {
                    f64::NAN
                } else {
                    dot / (norm_a * norm_b)
                }
            }
            SimilarityMetric::DotProduct => dot,
            SimilarityMetric::Euclidean => {
                let distance: f64 = a
                    .iter()
                    .zip(b)
                    .map(|(x, y)| (f64::from(*x) - f64::from(*y)).powi(2))
                    .sum::<f64>()
                    .sqrt();
                1.0 / (1.0 + distance)
            }
        }
    }

    /// Inverts the pgvector distance returned by [`Self::operator`].
    pub fn similarity_from_distance(self, distance: f64) -> f64 {
        match self {
            SimilarityMetric::Cosine => 1.0 - distance,
            // `<#>` returns the negative inner product
            SimilarityMetric::DotProduct => -distance,
            SimilarityMetric::Euclidean => 1.0 / (1.0 + distance),
        }
    }
}

fn norm(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt()
}

/// How raw similarities are mapped into `[0, 1]`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScoreNormalization {
    /// Negative similarities become 0, values above 1 become 1.
    #[default]
    Clamp,
    /// `(s + 1) / 2`, mapping cosine `[-1, 1]` onto `[0, 1]`.
    Rescale,
}

/// Exact-match conjunction over metadata keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter(Metadata);

impl MetadataFilter {
    pub fn new(pairs: Metadata) -> Self {
        Self(pairs)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    /// Every pair must be present with an equal value. Numbers compare by
    /// value at any depth (`1` equals `1.0`), the way jsonb equality does.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.0.iter().all(|(key, expected)| {
            metadata
                .get(key)
                .is_some_and(|actual| json_values_equal(actual, expected))
        })
    }
}

fn json_values_equal(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    use serde_json::Value;

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| json_values_equal(x, y)))
        }
        _ => a == b,
    }
}

impl From<Option<Metadata>> for MetadataFilter {
    fn from(pairs: Option<Metadata>) -> Self {
        Self(pairs.unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingEngine {
    metric: SimilarityMetric,
    normalization: ScoreNormalization,
    default_limit: u64,
    max_limit: u64,
}

impl RankingEngine {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            metric: config.metric,
            normalization: config.score_normalization,
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    /// Applies the default and rejects `0` or anything above the maximum.
    pub fn resolve_limit(&self, requested: Option<u64>) -> VectorStoreResult<u64> {
        match requested {
            None => Ok(self.default_limit),
            Some(limit) if limit == 0 || limit > self.max_limit => {
                Err(VectorStoreError::invalid_param(
                    "limit",
                    format!("limit must be between 1 and {}", self.max_limit),
                ))
            }
            Some(limit) => Ok(limit),
        }
    }

    /// Normalized score for a raw similarity. NaN scores 0.
    pub fn normalize(&self, similarity: f64) -> f32 {
        if similarity.is_nan() {
            return 0.0;
        }
        let score = match (self.metric, self.normalization) {
            (SimilarityMetric::Cosine, ScoreNormalization::Rescale) => (similarity + 1.0) / 2.0,
            _ => similarity,
        };
        score.clamp(0.0, 1.0) as f32
    }

    pub fn score_distance(&self, distance: f64) -> f32 {
        self.normalize(self.metric.similarity_from_distance(distance))
    }

    /// Filters, orders, truncates and scores `candidates` against `query`.
    pub fn rank<'a>(
        &self,
        query: &[f32],
        candidates: impl IntoIterator<Item = &'a Embedding>,
        filter: &MetadataFilter,
        limit: u64,
    ) -> Vec<SearchHit> {
        let mut scored: Vec<(f64, &Embedding)> = candidates
            .into_iter()
            .filter(|candidate| filter.matches(&candidate.metadata))
            .map(|candidate| (self.metric.similarity(query, &candidate.embedding), candidate))
            .collect();

        scored.sort_by(|(sa, a), (sb, b)| {
            sort_key(*sb)
                .total_cmp(&sort_key(*sa))
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        scored
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|(similarity, embedding)| SearchHit {
                id: embedding.id.clone(),
                content: embedding.content.clone(),
                metadata: embedding.metadata.clone(),
                created_at: embedding.created_at,
                score: self.normalize(similarity),
            })
            .collect()
    }
}

impl Default for RankingEngine {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

// Undefined similarities sort after everything else, as pgvector's NaN does.
fn sort_key(similarity: f64) -> f64 {
    if similarity.is_nan() {
        f64::NEG_INFINITY
    } else {
        similarity
    }
}

use async_trait::async_trait;

use crate::error::VectorStoreResult;

/// Vector produced for one input, with the tokens the gateway billed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingOutput {
    pub vector: Vec<f32>,
    pub tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingBatchOutput {
    /// One vector per input, in input order.
    pub vectors: Vec<Vec<f32>>,
    pub total_tokens: u32,
}

/// Text-to-vector gateway.
///
/// Implementations surface failures as `Gateway` or `GatewayTimeout` and
/// never retry on their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model name sent to the gateway
    fn model(&self) -> String;

    /// Length of every vector this provider returns
    fn dimensions(&self) -> usize;

    /// Embed a single text
    async fn embed(&self, text: &str) -> VectorStoreResult<EmbeddingOutput>;

    /// Embed several texts in one request
    async fn embed_batch(&self, texts: &[String]) -> VectorStoreResult<EmbeddingBatchOutput>;
}

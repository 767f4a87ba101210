use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{EmbeddingBatchOutput, EmbeddingOutput, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::{VectorStoreError, VectorStoreResult};

/// Client for an OpenAI-compatible `/embeddings` endpoint (LiteLLM, OpenAI, vLLM).
pub struct OpenAIProvider {
    client: Client,
    config: EmbeddingConfig,
    endpoint: String,
}

impl OpenAIProvider {
    pub fn new(config: EmbeddingConfig) -> VectorStoreResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VectorStoreError::Gateway(format!("failed to build HTTP client: {}", e)))?;
        let endpoint = format!("{}/embeddings", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: EmbeddingUsage,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingUsage {
    #[serde(default)]
    total_tokens: u32,
}

fn transport_error(err: reqwest::Error) -> VectorStoreError {
    if err.is_timeout() {
        VectorStoreError::GatewayTimeout(err.to_string())
    } else {
        VectorStoreError::Gateway(err.to_string())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model(&self) -> String {
        self.config.model.clone()
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    async fn embed(&self, text: &str) -> VectorStoreResult<EmbeddingOutput> {
        let output = self.embed_batch(&[text.to_string()]).await?;
        let vector = output
            .vectors
            .into_iter()
            .next()
            .ok_or_else(|| VectorStoreError::Gateway("no embedding returned".to_string()))?;

        Ok(EmbeddingOutput {
            vector,
            tokens: output.total_tokens,
        })
    }

    #[instrument(skip(self, texts), fields(model = %self.config.model, inputs = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> VectorStoreResult<EmbeddingBatchOutput> {
        if texts.is_empty() {
            return Ok(EmbeddingBatchOutput {
                vectors: vec![],
                total_tokens: 0,
            });
        }

        let request = EmbeddingRequest {
            model: &self.config.model,
            input: texts,
            dimensions: self.config.send_dimensions.then_some(self.config.dimensions),
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let response = builder.send().await.map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %error_text, "Embedding gateway returned an error");
            return Err(VectorStoreError::Gateway(format!(
                "gateway returned {}",
                status
            )));
        }

        let body: EmbeddingResponse = response.json().await.map_err(transport_error)?;

        if body.data.len() != texts.len() {
            return Err(VectorStoreError::Gateway(format!(
                "expected {} embeddings, gateway returned {}",
                texts.len(),
                body.data.len()
            )));
        }

        // Sort by index to maintain input order
        let mut data = body.data;
        data.sort_by_key(|d| d.index);

        let expected = self.config.dimensions;
        if let Some(bad) = data.iter().find(|d| d.embedding.len() != expected) {
            return Err(VectorStoreError::Gateway(format!(
                "gateway returned a {}-dimensional vector, expected {}",
                bad.embedding.len(),
                expected
            )));
        }

        tracing::debug!(tokens = body.usage.total_tokens, "Embedded batch");

        Ok(EmbeddingBatchOutput {
            vectors: data.into_iter().map(|d| d.embedding).collect(),
            total_tokens: body.usage.total_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_dimensions_by_default() {
        let input = vec!["hello".to_string()];
        let request = EmbeddingRequest {
            model: "text-embedding-ada-002",
            input: &input,
            dimensions: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({ "model": "text-embedding-ada-002", "input": ["hello"] })
        );
    }

    #[test]
    fn test_response_without_usage_parses() {
        let body: EmbeddingResponse =
            serde_json::from_value(json!({ "data": [{ "embedding": [0.1], "index": 0 }] }))
                .unwrap();
        assert_eq!(body.usage.total_tokens, 0);
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let provider = OpenAIProvider::new(EmbeddingConfig {
            base_url: "http://litellm:4000/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(provider.endpoint, "http://litellm:4000/embeddings");
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let provider = OpenAIProvider::new(EmbeddingConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        })
        .unwrap();
        let output = provider.embed_batch(&[]).await.unwrap();
        assert!(output.vectors.is_empty());
    }
}

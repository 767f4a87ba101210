mod openai;
mod provider;

pub use openai::OpenAIProvider;
pub use provider::{EmbeddingBatchOutput, EmbeddingOutput, EmbeddingProvider};

#[cfg(test)]
pub use provider::MockEmbeddingProvider;

mod openai;
mod provider;

pub use openai::{DEFAULT_MODEL, EmbeddingConfig, OpenAICompatibleProvider};
pub use provider::EmbeddingProvider;

#[cfg(test)]
pub use provider::MockEmbeddingProvider;

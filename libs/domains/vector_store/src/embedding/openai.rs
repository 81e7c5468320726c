use std::time::Duration;

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse, env_required};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::EmbeddingProvider;
use crate::error::{VectorError, VectorResult};
use crate::models::EmbeddingAction;

pub const DEFAULT_MODEL: &str = "intfloat/multilingual-e5-small";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for an OpenAI-compatible embeddings endpoint
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Full URL the request is POSTed to
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl FromEnv for EmbeddingConfig {
    /// Requires `EMBEDDING_ENDPOINT`; `EMBEDDING_API_KEY`, `EMBEDDING_MODEL`
    /// and `EMBEDDING_TIMEOUT_SECS` are optional.
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: env_required("EMBEDDING_ENDPOINT")?,
            api_key: env_optional("EMBEDDING_API_KEY").unwrap_or_default(),
            model: env_or_default("EMBEDDING_MODEL", DEFAULT_MODEL),
            timeout_secs: env_parse("EMBEDDING_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
        })
    }
}

/// Embedding provider speaking the OpenAI `/embeddings` wire format
pub struct OpenAICompatibleProvider {
    client: Client,
    config: EmbeddingConfig,
}

impl OpenAICompatibleProvider {
    pub fn new(config: EmbeddingConfig) -> VectorResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VectorError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> VectorResult<Self> {
        Self::new(EmbeddingConfig::from_env()?)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Newlines become spaces; some index tokenizers treat them as separators.
pub(crate) fn normalize_text(text: &str) -> String {
    text.replace("\r\n", " ").replace('\n', " ")
}

/// Extract `data[0].embedding` from a response body.
pub(crate) fn parse_embedding_response(body: &str) -> VectorResult<Vec<f32>> {
    let response: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| VectorError::Embedding(format!("Malformed embedding response: {}", e)))?;

    response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| VectorError::Embedding("No embedding returned".to_string()))
}

#[async_trait]
impl EmbeddingProvider for OpenAICompatibleProvider {
    #[instrument(skip(self, text), fields(model = %self.config.model, action = ?action, chars = text.len()))]
    async fn embed(&self, text: &str, action: Option<EmbeddingAction>) -> VectorResult<Vec<f32>> {
        let input = normalize_text(text);
        if input.trim().is_empty() {
            return Err(VectorError::Validation(
                "Cannot embed empty text".to_string(),
            ));
        }

        let request = EmbeddingRequest {
            model: &self.config.model,
            input: vec![input],
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(VectorError::Embedding(format!(
                "Embedding API error ({}): {}",
                status, body
            )));
        }

        let embedding = parse_embedding_response(&body)?;
        debug!(dimension = embedding.len(), "Embedding generated");

        Ok(embedding)
    }
}

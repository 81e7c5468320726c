use async_trait::async_trait;

use crate::error::VectorResult;
use crate::models::EmbeddingAction;

/// Turns text into a fixed-length vector.
///
/// One call per text; implementations neither cache nor retry, and they do
/// not check the returned dimension.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text. `action` is a routing hint and may be ignored.
    async fn embed(&self, text: &str, action: Option<EmbeddingAction>) -> VectorResult<Vec<f32>>;
}

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::embedding::EmbeddingProvider;
use crate::error::{VectorError, VectorResult};
use crate::filter::SearchFilter;
use crate::models::{EmbeddingAction, Payload, SearchOutcome, SearchQuery};
use crate::store::VectorStore;

/// Payload key holding the text a record was embedded from
pub const DATA_KEY: &str = "data";

/// Text-level operations: embeds text, then delegates to the store
pub struct MemoryService<S: VectorStore> {
    store: S,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl<S: VectorStore> MemoryService<S> {
    pub fn new(store: S, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Embed `text` and store it. The text is kept under `payload.data`
    /// unless the payload already sets it.
    #[instrument(skip(self, text, payload))]
    pub async fn add(
        &self,
        text: &str,
        mut payload: Payload,
        id: Option<String>,
    ) -> VectorResult<String> {
        let vector = self.embedder.embed(text, Some(EmbeddingAction::Add)).await?;

        payload
            .entry(DATA_KEY.to_string())
            .or_insert_with(|| text.into());

        let ids = self
            .store
            .insert(vec![vector], Some(vec![payload]), id.map(|id| vec![id]))
            .await?;

        ids.into_iter()
            .next()
            .ok_or_else(|| VectorError::Internal("Store returned no id".to_string()))
    }

    #[instrument(skip(self, query))]
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        filter: Option<SearchFilter>,
    ) -> VectorResult<SearchOutcome> {
        let vector = self.embedder.embed(query, Some(EmbeddingAction::Search)).await?;

        let mut search = SearchQuery::new(vector, limit);
        if let Some(filter) = filter {
            search = search.with_filter(filter);
        }

        let outcome = self.store.search_detailed(search).await;
        debug!(hits = outcome.results.len(), status = ?outcome.status, "Memory search finished");
        Ok(outcome)
    }

    /// Re-embed a record from new text.
    ///
    /// Without a payload the stored one is kept, with `data` replaced.
    /// `Ok(false)` when the record does not exist.
    #[instrument(skip(self, text, payload))]
    pub async fn update_text(
        &self,
        id: &str,
        text: &str,
        payload: Option<Payload>,
    ) -> VectorResult<bool> {
        let mut payload = match payload {
            Some(payload) => payload,
            None => match self.store.get(id).await? {
                Some(record) => record.payload,
                None => return Ok(false),
            },
        };
        payload.insert(DATA_KEY.to_string(), text.into());

        let vector = self
            .embedder
            .embed(text, Some(EmbeddingAction::Update))
            .await?;

        self.store.update(id, Some(vector), Some(payload)).await
    }
}

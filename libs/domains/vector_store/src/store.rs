use async_trait::async_trait;

use crate::error::VectorResult;
use crate::filter::SearchFilter;
use crate::models::{IndexDiagnostics, Payload, Record, SearchOutcome, SearchQuery, SearchResult};
use crate::query::SearchStrategy;

/// Vector storage operations over a single collection
///
/// Implementations hold the collection name and dimension; every vector
/// passed in is checked against that dimension before anything is written.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    // ===== Collection Management =====

    /// Create the collection if it does not exist yet
    async fn create_collection(&self) -> VectorResult<()>;

    /// Drop the collection (if present) and create it again, empty
    async fn reset(&self) -> VectorResult<()>;

    /// Names of every collection on the cluster
    async fn list_collections(&self) -> VectorResult<Vec<String>>;

    /// Mapping, settings, document count and a few sample records
    async fn inspect(&self) -> VectorResult<IndexDiagnostics>;

    // ===== Record Operations =====

    /// Store one record per vector and return the stored ids in input order.
    ///
    /// `payloads` and `ids`, when given, must have the same length as `vectors`.
    async fn insert(
        &self,
        vectors: Vec<Vec<f32>>,
        payloads: Option<Vec<Payload>>,
        ids: Option<Vec<String>>,
    ) -> VectorResult<Vec<String>>;

    async fn get(&self, id: &str) -> VectorResult<Option<Record>>;

    /// Replace the vector and/or the payload of a record. `Ok(false)` when
    /// the record does not exist.
    async fn update(
        &self,
        id: &str,
        vector: Option<Vec<f32>>,
        payload: Option<Payload>,
    ) -> VectorResult<bool>;

    /// `Ok(false)` when there was nothing to delete
    async fn delete(&self, id: &str) -> VectorResult<bool>;

    async fn list(
        &self,
        filter: Option<SearchFilter>,
        limit: Option<usize>,
    ) -> VectorResult<Vec<Record>>;

    // ===== Search =====

    /// Nearest records to the query vector, best first.
    ///
    /// Never fails: when no strategy can answer, the result is empty.
    async fn search(&self, query: SearchQuery) -> Vec<SearchResult>;

    /// Like [`VectorStore::search`], but reports which strategy answered.
    async fn search_detailed(&self, query: SearchQuery) -> SearchOutcome;

    /// Run a single strategy without fallback
    async fn search_with(
        &self,
        strategy: SearchStrategy,
        query: SearchQuery,
    ) -> VectorResult<Vec<SearchResult>>;
}

//! Vector Store Domain Library
//!
//! Stores and searches memory records in an OpenSearch k-NN index, with text
//! turned into vectors by an external embedding service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  MemoryService  │  ← Text in, embedding + store operations
//! └────────┬────────┘
//!          │
//! ┌────────▼─────────┐     ┌──────────────────┐
//! │   VectorStore    │     │ EmbeddingProvider │
//! │     (trait)      │     │     (trait)       │
//! └────────┬─────────┘     └────────┬─────────┘
//!          │                        │
//! ┌────────▼─────────┐     ┌────────▼─────────────────┐
//! │VectorStoreAdapter│     │ OpenAICompatibleProvider │
//! └────────┬─────────┘     └──────────────────────────┘
//!          │
//! ┌────────▼─────────┐
//! │   IndexClient    │  ← OpenSearchClient (REST)
//! └──────────────────┘
//! ```
//!
//! # Features
//!
//! - **Filtered search**: `user_id` / `run_id` / `agent_id` exact-match filters
//! - **Fallback**: k-NN first, exact cosine `script_score` when k-NN is rejected
//! - **Stable results**: nested and flat hit listings normalize to the same shape
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_vector_store::{
//!     EmbeddingConfig, MemoryService, OpenAICompatibleProvider, OpenSearchConfig,
//!     SearchFilter, VectorStore, VectorStoreAdapter,
//! };
//! use core_config::FromEnv;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OpenSearchConfig::from_env()?;
//! let store = VectorStoreAdapter::from_config(&config)?;
//! store.create_collection().await?;
//!
//! let embedder = Arc::new(OpenAICompatibleProvider::new(EmbeddingConfig::from_env()?)?);
//! let service = MemoryService::new(store, embedder);
//!
//! service.add("Prefers window seats", Default::default(), None).await?;
//! let outcome = service
//!     .search("seating preferences", 5, Some(SearchFilter::new().user_id("u1")))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod models;
pub mod normalize;
pub mod opensearch;
pub mod query;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use adapter::{CollectionConfig, VectorStoreAdapter};
pub use embedding::{EmbeddingConfig, EmbeddingProvider, OpenAICompatibleProvider};
pub use error::{VectorError, VectorResult};
pub use filter::{FilterKey, SearchFilter};
pub use models::{
    EmbeddingAction, IndexDiagnostics, Payload, PayloadValue, Record, SearchOutcome, SearchQuery,
    SearchResult, SearchStatus,
};
pub use normalize::{Listing, flatten_listing};
pub use opensearch::{IndexClient, OpenSearchClient, OpenSearchConfig, RefreshPolicy};
pub use query::SearchStrategy;
pub use service::MemoryService;
pub use store::VectorStore;

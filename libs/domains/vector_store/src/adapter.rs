use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{VectorError, VectorResult};
use crate::filter::SearchFilter;
use crate::models::{
    IndexDiagnostics, Payload, Record, SearchOutcome, SearchQuery, SearchResult, SearchStatus,
    payload_from_json, validate_payload,
};
use crate::normalize::{Listing, flatten_listing};
use crate::opensearch::{IndexClient, OpenSearchClient, OpenSearchConfig};
use crate::query::{
    LIST_PAGE_SIZE, SAMPLE_SIZE, SearchStrategy, document, id_lookup_query, index_body,
    list_query, partial_document, sample_query,
};
use crate::store::VectorStore;

/// Name and vector dimension of the collection an adapter works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionConfig {
    pub name: String,
    pub dimension: usize,
}

/// [`VectorStore`] backed by an OpenSearch index
pub struct VectorStoreAdapter<C: IndexClient> {
    client: C,
    collection: CollectionConfig,
}

impl VectorStoreAdapter<OpenSearchClient> {
    pub fn from_config(config: &OpenSearchConfig) -> VectorResult<Self> {
        let client = OpenSearchClient::new(config)?;
        Ok(Self::new(
            client,
            config.collection_name.clone(),
            config.dimension,
        ))
    }
}

impl<C: IndexClient> VectorStoreAdapter<C> {
    pub fn new(client: C, collection_name: impl Into<String>, dimension: usize) -> Self {
        Self {
            client,
            collection: CollectionConfig {
                name: collection_name.into(),
                dimension,
            },
        }
    }

    pub fn collection(&self) -> &CollectionConfig {
        &self.collection
    }

    /// Length must match the collection dimension and every value must be finite.
    pub fn validate_vector(&self, vector: &[f32]) -> VectorResult<()> {
        if vector.len() != self.collection.dimension {
            return Err(VectorError::InvalidVector(format!(
                "expected {} dimensions, got {}",
                self.collection.dimension,
                vector.len()
            )));
        }
        if let Some(pos) = vector.iter().position(|v| !v.is_finite()) {
            return Err(VectorError::InvalidVector(format!(
                "non-finite value at position {}",
                pos
            )));
        }
        Ok(())
    }

    fn validate_query(&self, query: &SearchQuery) -> VectorResult<()> {
        if query.limit == 0 {
            return Err(VectorError::Validation(
                "limit must be at least 1".to_string(),
            ));
        }
        self.validate_vector(&query.vector)
    }

    /// Index `_id` of the record with this id, if any
    async fn resolve_doc_id(&self, id: &str) -> VectorResult<Option<String>> {
        Ok(self.find_hit(id).await?.map(|hit| hit.doc_id))
    }

    /// Realtime get by `_id` first, then a search on the stored `id` field.
    ///
    /// A missing collection holds no records.
    async fn find_hit(&self, id: &str) -> VectorResult<Option<Hit>> {
        if let Some(found) = self
            .client
            .get_document(&self.collection.name, id)
            .await?
        {
            return Ok(Some(serde_json::from_value(found)?));
        }

        let response = match self
            .client
            .search(&self.collection.name, id_lookup_query(id))
            .await
        {
            Ok(response) => response,
            Err(e) if e.index_status() == Some(404) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(parse_hits(response)?.into_iter().next())
    }

    /// Every matching record, paged by `_id` with `search_after`
    async fn list_all(&self, filter: Option<&SearchFilter>) -> VectorResult<Vec<Record>> {
        let mut records = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let body = list_query(filter, LIST_PAGE_SIZE, after.as_deref());
            let response = self.client.search(&self.collection.name, body).await?;
            let hits = parse_hits(response)?;

            let page_len = hits.len();
            after = hits.last().map(|hit| hit.doc_id.clone());
            records.extend(hits.into_iter().map(Hit::into_record));

            if page_len < LIST_PAGE_SIZE {
                break;
            }
            debug!(fetched = records.len(), "Fetching next list page");
        }
        Ok(records)
    }
}

/// One entry of `hits.hits`
#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    doc_id: String,
    #[serde(rename = "_score", default)]
    score: Option<f32>,
    #[serde(rename = "_source", default)]
    source: HitSource,
}

#[derive(Debug, Default, Deserialize)]
struct HitSource {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "vector_field", default)]
    vector: Option<Vec<f32>>,
    #[serde(default)]
    payload: Value,
}

impl Hit {
    /// Stored `id` field first; index-assigned records only have `_id`.
    fn into_record(self) -> Record {
        Record {
            id: self.source.id.unwrap_or(self.doc_id),
            vector: self.source.vector,
            payload: payload_from_json(self.source.payload),
        }
    }

    fn into_result(self) -> SearchResult {
        let score = self.score.unwrap_or_default();
        let record = self.into_record();
        SearchResult {
            id: record.id,
            score,
            payload: record.payload,
        }
    }
}

/// Normalized `hits.hits` from a search response
fn parse_hits(mut response: Value) -> VectorResult<Vec<Hit>> {
    let hits = response
        .pointer_mut("/hits/hits")
        .map(Value::take)
        .ok_or_else(|| VectorError::Internal("Search response carried no hits".to_string()))?;

    let listing: Vec<Listing<Hit>> = serde_json::from_value(hits)?;
    Ok(flatten_listing(listing))
}

#[async_trait]
impl<C: IndexClient> VectorStore for VectorStoreAdapter<C> {
    #[instrument(skip(self), fields(collection = %self.collection.name, dimension = self.collection.dimension))]
    async fn create_collection(&self) -> VectorResult<()> {
        if self.client.index_exists(&self.collection.name).await? {
            debug!("Collection already exists");
            return Ok(());
        }

        self.client
            .create_index(&self.collection.name, index_body(self.collection.dimension))
            .await?;
        info!("Collection created");
        Ok(())
    }

    #[instrument(skip(self), fields(collection = %self.collection.name))]
    async fn reset(&self) -> VectorResult<()> {
        let existed = self.client.delete_index(&self.collection.name).await?;
        if !existed {
            debug!("Collection did not exist before reset");
        }
        self.create_collection().await?;
        info!("Collection reset");
        Ok(())
    }

    async fn list_collections(&self) -> VectorResult<Vec<String>> {
        self.client.list_indices().await
    }

    #[instrument(skip(self), fields(collection = %self.collection.name))]
    async fn inspect(&self) -> VectorResult<IndexDiagnostics> {
        let name = &self.collection.name;
        let mapping = self.client.get_mapping(name).await?;
        let settings = self.client.get_settings(name).await?;
        let total_docs = self.client.count(name).await?;

        let response = self.client.search(name, sample_query(SAMPLE_SIZE)).await?;
        let sample_docs = parse_hits(response)?
            .into_iter()
            .map(Hit::into_record)
            .collect();

        Ok(IndexDiagnostics {
            collection: name.clone(),
            mapping,
            settings,
            total_docs,
            sample_docs,
        })
    }

    #[instrument(skip(self, vectors, payloads, ids), fields(collection = %self.collection.name, count = vectors.len()))]
    async fn insert(
        &self,
        vectors: Vec<Vec<f32>>,
        payloads: Option<Vec<Payload>>,
        ids: Option<Vec<String>>,
    ) -> VectorResult<Vec<String>> {
        if let Some(payloads) = &payloads {
            if payloads.len() != vectors.len() {
                return Err(VectorError::Validation(format!(
                    "{} payloads for {} vectors",
                    payloads.len(),
                    vectors.len()
                )));
            }
        }
        if let Some(ids) = &ids {
            if ids.len() != vectors.len() {
                return Err(VectorError::Validation(format!(
                    "{} ids for {} vectors",
                    ids.len(),
                    vectors.len()
                )));
            }
            if ids.iter().any(|id| id.is_empty()) {
                return Err(VectorError::Validation("ids must not be empty".to_string()));
            }
        }
        if let Some(payloads) = &payloads {
            for (i, payload) in payloads.iter().enumerate() {
                validate_payload(payload).map_err(|e| match e {
                    VectorError::Validation(msg) => {
                        VectorError::Validation(format!("record {}: {}", i, msg))
                    }
                    other => other,
                })?;
            }
        }

        // Nothing is written unless every vector is valid
        for (i, vector) in vectors.iter().enumerate() {
            self.validate_vector(vector).map_err(|e| match e {
                VectorError::InvalidVector(msg) => {
                    VectorError::InvalidVector(format!("record {}: {}", i, msg))
                }
                other => other,
            })?;
        }

        let mut payloads = payloads.map(Vec::into_iter);
        let mut ids = ids.map(Vec::into_iter);
        let mut stored = Vec::with_capacity(vectors.len());

        for vector in vectors {
            let payload = payloads
                .as_mut()
                .and_then(Iterator::next)
                .unwrap_or_default();
            let id = ids.as_mut().and_then(Iterator::next);

            let body = document(id.as_deref(), &vector, &payload);
            let doc_id = self
                .client
                .index_document(&self.collection.name, id, body)
                .await?;
            stored.push(doc_id);
        }

        info!(inserted = stored.len(), "Records inserted");
        Ok(stored)
    }

    #[instrument(skip(self), fields(collection = %self.collection.name))]
    async fn get(&self, id: &str) -> VectorResult<Option<Record>> {
        Ok(self.find_hit(id).await?.map(Hit::into_record))
    }

    #[instrument(skip(self, vector, payload), fields(collection = %self.collection.name))]
    async fn update(
        &self,
        id: &str,
        vector: Option<Vec<f32>>,
        payload: Option<Payload>,
    ) -> VectorResult<bool> {
        if let Some(vector) = &vector {
            self.validate_vector(vector)?;
        }
        if let Some(payload) = &payload {
            validate_payload(payload)?;
        }

        let Some(doc_id) = self.resolve_doc_id(id).await? else {
            debug!("No record to update");
            return Ok(false);
        };

        let Some(partial) = partial_document(vector.as_deref(), payload.as_ref()) else {
            debug!("Nothing to update");
            return Ok(true);
        };

        match self
            .client
            .update_document(&self.collection.name, &doc_id, partial)
            .await
        {
            Ok(()) => {
                debug!("Record updated");
                Ok(true)
            }
            // deleted between lookup and update
            Err(e) if e.index_status() == Some(404) => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(collection = %self.collection.name))]
    async fn delete(&self, id: &str) -> VectorResult<bool> {
        let Some(doc_id) = self.resolve_doc_id(id).await? else {
            debug!("No record to delete");
            return Ok(false);
        };

        let deleted = self
            .client
            .delete_document(&self.collection.name, &doc_id)
            .await?;
        debug!(deleted, "Record delete finished");
        Ok(deleted)
    }

    #[instrument(skip(self), fields(collection = %self.collection.name))]
    async fn list(
        &self,
        filter: Option<SearchFilter>,
        limit: Option<usize>,
    ) -> VectorResult<Vec<Record>> {
        let records: Vec<Record> = match limit {
            Some(limit) => {
                let response = self
                    .client
                    .search(&self.collection.name, list_query(filter.as_ref(), limit, None))
                    .await?;
                parse_hits(response)?
                    .into_iter()
                    .map(Hit::into_record)
                    .collect()
            }
            None => self.list_all(filter.as_ref()).await?,
        };
        debug!(count = records.len(), "Records listed");
        Ok(records)
    }

    async fn search(&self, query: SearchQuery) -> Vec<SearchResult> {
        self.search_detailed(query).await.results
    }

    #[instrument(skip(self, query), fields(collection = %self.collection.name, limit = query.limit))]
    async fn search_detailed(&self, query: SearchQuery) -> SearchOutcome {
        if let Err(e) = self.validate_query(&query) {
            error!(error = %e, "Search query rejected; returning no results");
            return SearchOutcome::failed(e.to_string());
        }

        let mut failures = Vec::new();
        for (attempt, strategy) in SearchStrategy::ORDER.into_iter().enumerate() {
            match self.run_strategy(strategy, &query).await {
                Ok(results) => {
                    let status = if attempt == 0 {
                        SearchStatus::Primary
                    } else {
                        warn!(%strategy, "Search answered by fallback strategy");
                        SearchStatus::Fallback
                    };
                    debug!(%strategy, hits = results.len(), "Search finished");
                    return SearchOutcome { results, status };
                }
                Err(e) => {
                    warn!(%strategy, error = %e, "Search strategy failed");
                    failures.push(format!("{}: {}", strategy, e));
                }
            }
        }

        let reason = failures.join("; ");
        error!(%reason, "All search strategies failed; returning no results");
        SearchOutcome::failed(reason)
    }

    #[instrument(skip(self, query), fields(collection = %self.collection.name, limit = query.limit))]
    async fn search_with(
        &self,
        strategy: SearchStrategy,
        query: SearchQuery,
    ) -> VectorResult<Vec<SearchResult>> {
        self.validate_query(&query)?;
        self.run_strategy(strategy, &query).await
    }
}

impl<C: IndexClient> VectorStoreAdapter<C> {
    async fn run_strategy(
        &self,
        strategy: SearchStrategy,
        query: &SearchQuery,
    ) -> VectorResult<Vec<SearchResult>> {
        let body = strategy.build_query(&query.vector, query.limit, query.filter.as_ref());
        let response = self.client.search(&self.collection.name, body).await?;

        Ok(parse_hits(response)?
            .into_iter()
            .map(Hit::into_result)
            .collect())
    }
}

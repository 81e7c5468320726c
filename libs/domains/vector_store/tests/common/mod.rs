//! In-memory stand-ins for the index and the embedding service.
//!
//! `InMemoryIndex` interprets the request bodies the adapter sends (term
//! filters, ids lookups, knn and script_score queries) closely enough to
//! check end-to-end behavior without a cluster.

#![allow(dead_code)]

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, BTreeSet};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domain_vector_store::query::VECTOR_FIELD;
use domain_vector_store::{
    EmbeddingAction, EmbeddingProvider, IndexClient, Payload, VectorError, VectorResult,
    VectorStoreAdapter,
};
use serde_json::{Value, json};

pub const DIM: usize = 4;

#[derive(Default)]
struct StoredIndex {
    body: Value,
    docs: BTreeMap<String, Value>,
    /// Written but not yet visible to searches
    pending: BTreeSet<String>,
}

#[derive(Default)]
struct State {
    indices: Mutex<BTreeMap<String, StoredIndex>>,
    next_id: AtomicUsize,
    writes: AtomicUsize,
    searches: AtomicUsize,
    reject_knn: AtomicBool,
    reject_script_score: AtomicBool,
    nest_hits: AtomicBool,
    hold_refresh: AtomicBool,
}

/// Shared handle; clones see the same indices
#[derive(Clone, Default)]
pub struct InMemoryIndex {
    state: Arc<State>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document writes (index, update, delete) seen so far
    pub fn writes(&self) -> usize {
        self.state.writes.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> usize {
        self.state.searches.load(Ordering::SeqCst)
    }

    pub fn reject_knn(&self, reject: bool) {
        self.state.reject_knn.store(reject, Ordering::SeqCst);
    }

    pub fn reject_script_score(&self, reject: bool) {
        self.state.reject_script_score.store(reject, Ordering::SeqCst);
    }

    /// Answer with `hits.hits` wrapped in one extra list
    pub fn nest_hits(&self, nest: bool) {
        self.state.nest_hits.store(nest, Ordering::SeqCst);
    }

    /// Keep new writes out of searches until [`InMemoryIndex::refresh`]
    pub fn hold_refresh(&self, hold: bool) {
        self.state.hold_refresh.store(hold, Ordering::SeqCst);
    }

    /// Make every write visible to searches
    pub fn refresh(&self) {
        let mut indices = self.state.indices.lock().unwrap();
        for stored in indices.values_mut() {
            stored.pending.clear();
        }
    }

    /// Raw stored source of a document
    pub fn source(&self, index: &str, doc_id: &str) -> Option<Value> {
        let indices = self.state.indices.lock().unwrap();
        indices.get(index)?.docs.get(doc_id).cloned()
    }

    fn with_index<T>(
        &self,
        index: &str,
        f: impl FnOnce(&mut StoredIndex) -> VectorResult<T>,
    ) -> VectorResult<T> {
        let mut indices = self.state.indices.lock().unwrap();
        match indices.get_mut(index) {
            Some(stored) => f(stored),
            None => Err(VectorError::Index {
                status: 404,
                reason: format!("index_not_found_exception: no such index [{}]", index),
            }),
        }
    }

    fn rejected(strategy: &str) -> VectorError {
        VectorError::Index {
            status: 400,
            reason: format!("search_phase_execution_exception: {} rejected", strategy),
        }
    }
}

fn as_vector(value: &Value) -> Vec<f32> {
    value
        .as_array()
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_f64)
                .map(|v| v as f32)
                .collect()
        })
        .unwrap_or_default()
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Value at a dotted path; a trailing `.keyword` addresses the field itself
fn field_value<'a>(source: &'a Value, field: &str) -> Option<&'a Value> {
    let path = field.strip_suffix(".keyword").unwrap_or(field);
    path.split('.').try_fold(source, |value, segment| value.get(segment))
}

fn matches(query: &Value, doc_id: &str, source: &Value) -> bool {
    if query.is_null() || query.get("match_all").is_some() {
        return true;
    }
    if let Some(term) = query.get("term").and_then(Value::as_object) {
        return term
            .iter()
            .all(|(field, expected)| field_value(source, field) == Some(expected));
    }
    if let Some(ids) = query.get("ids") {
        return ids["values"]
            .as_array()
            .is_some_and(|values| values.iter().any(|v| v == doc_id));
    }
    if let Some(clauses) = query.get("bool") {
        let filter_ok = clauses
            .get("filter")
            .and_then(Value::as_array)
            .is_none_or(|all| all.iter().all(|c| matches(c, doc_id, source)));
        let should_ok = clauses
            .get("should")
            .and_then(Value::as_array)
            .is_none_or(|any| any.iter().any(|c| matches(c, doc_id, source)));
        return filter_ok && should_ok;
    }
    false
}

fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[async_trait]
impl IndexClient for InMemoryIndex {
    async fn index_exists(&self, index: &str) -> VectorResult<bool> {
        Ok(self.state.indices.lock().unwrap().contains_key(index))
    }

    async fn create_index(&self, index: &str, body: Value) -> VectorResult<()> {
        let mut indices = self.state.indices.lock().unwrap();
        indices.entry(index.to_string()).or_insert_with(|| StoredIndex {
            body,
            ..Default::default()
        });
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> VectorResult<bool> {
        Ok(self.state.indices.lock().unwrap().remove(index).is_some())
    }

    async fn list_indices(&self) -> VectorResult<Vec<String>> {
        Ok(self.state.indices.lock().unwrap().keys().cloned().collect())
    }

    async fn index_document(
        &self,
        index: &str,
        id: Option<String>,
        document: Value,
    ) -> VectorResult<String> {
        let doc_id = id.unwrap_or_else(|| {
            format!("auto-{}", self.state.next_id.fetch_add(1, Ordering::SeqCst))
        });
        let hold = self.state.hold_refresh.load(Ordering::SeqCst);
        self.with_index(index, |stored| {
            stored.docs.insert(doc_id.clone(), document);
            if hold {
                stored.pending.insert(doc_id.clone());
            }
            Ok(())
        })?;
        self.state.writes.fetch_add(1, Ordering::SeqCst);
        Ok(doc_id)
    }

    async fn get_document(&self, index: &str, doc_id: &str) -> VectorResult<Option<Value>> {
        let indices = self.state.indices.lock().unwrap();
        let Some(source) = indices.get(index).and_then(|stored| stored.docs.get(doc_id)) else {
            return Ok(None);
        };
        Ok(Some(json!({
            "_index": index,
            "_id": doc_id,
            "found": true,
            "_source": source,
        })))
    }

    async fn update_document(&self, index: &str, doc_id: &str, partial: Value) -> VectorResult<()> {
        self.with_index(index, |stored| match stored.docs.get_mut(doc_id) {
            Some(source) => {
                merge(source, &partial);
                Ok(())
            }
            None => Err(VectorError::Index {
                status: 404,
                reason: format!("document_missing_exception: [{}]: document missing", doc_id),
            }),
        })?;
        self.state.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_document(&self, index: &str, doc_id: &str) -> VectorResult<bool> {
        let deleted = self.with_index(index, |stored| {
            stored.pending.remove(doc_id);
            Ok(stored.docs.remove(doc_id).is_some())
        })?;
        self.state.writes.fetch_add(1, Ordering::SeqCst);
        Ok(deleted)
    }

    async fn search(&self, index: &str, body: Value) -> VectorResult<Value> {
        self.state.searches.fetch_add(1, Ordering::SeqCst);
        let reject_knn = self.state.reject_knn.load(Ordering::SeqCst);
        let reject_script_score = self.state.reject_script_score.load(Ordering::SeqCst);
        let nest_hits = self.state.nest_hits.load(Ordering::SeqCst);

        self.with_index(index, |stored| {
            let query = &body["query"];
            let size = body["size"].as_u64().unwrap_or(10) as usize;
            let visible: Vec<(&String, &Value)> = stored
                .docs
                .iter()
                .filter(|(id, _)| !stored.pending.contains(*id))
                .collect();

            let mut scored: Vec<(&String, f32, &Value)> = if let Some(knn) = query.get("knn") {
                if reject_knn {
                    return Err(Self::rejected("knn"));
                }
                let clause = &knn[VECTOR_FIELD];
                let vector = as_vector(&clause["vector"]);
                let k = clause["k"].as_u64().unwrap_or(10) as usize;

                let mut hits: Vec<_> = visible
                    .iter()
                    .copied()
                    .filter(|(id, source)| matches(&clause["filter"], id, source))
                    .map(|(id, source)| {
                        let score = (1.0 + cosine(&vector, &as_vector(&source[VECTOR_FIELD]))) / 2.0;
                        (id, score, source)
                    })
                    .collect();
                hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(CmpOrdering::Equal));
                hits.truncate(k);
                hits
            } else if let Some(script) = query.get("script_score") {
                if reject_script_score {
                    return Err(Self::rejected("script_score"));
                }
                let vector = as_vector(&script["script"]["params"]["query_vector"]);
                visible
                    .iter()
                    .copied()
                    .filter(|(id, source)| matches(&script["query"], id, source))
                    .map(|(id, source)| {
                        let score = cosine(&vector, &as_vector(&source[VECTOR_FIELD])) + 1.0;
                        (id, score, source)
                    })
                    .collect()
            } else {
                visible
                    .iter()
                    .copied()
                    .filter(|(id, source)| matches(query, id, source))
                    .map(|(id, source)| (id, 1.0, source))
                    .collect()
            };

            let sort_by_id = body["sort"][0].get("_id").is_some();
            if sort_by_id {
                scored.sort_by(|a, b| a.0.cmp(b.0));
                if let Some(after) = body["search_after"][0].as_str() {
                    scored.retain(|(id, _, _)| id.as_str() > after);
                }
            } else {
                scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(CmpOrdering::Equal));
            }
            let total = scored.len();
            scored.truncate(size);

            let excludes: Vec<&str> = body["_source"]["excludes"]
                .as_array()
                .map(|fields| fields.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();

            let hits: Vec<Value> = scored
                .into_iter()
                .map(|(id, score, source)| {
                    let mut source = source.clone();
                    if let Some(fields) = source.as_object_mut() {
                        for field in &excludes {
                            fields.remove(*field);
                        }
                    }
                    let mut hit = json!({ "_index": index, "_id": id, "_score": score, "_source": source });
                    if sort_by_id {
                        hit["sort"] = json!([id]);
                    }
                    hit
                })
                .collect();

            let hits = if nest_hits { json!([hits]) } else { json!(hits) };
            Ok(json!({
                "took": 1,
                "timed_out": false,
                "hits": { "total": { "value": total, "relation": "eq" }, "hits": hits },
            }))
        })
    }

    async fn count(&self, index: &str) -> VectorResult<u64> {
        self.with_index(index, |stored| Ok(stored.docs.len() as u64))
    }

    async fn get_mapping(&self, index: &str) -> VectorResult<Value> {
        self.with_index(index, |stored| {
            Ok(json!({ index: { "mappings": stored.body["mappings"].clone() } }))
        })
    }

    async fn get_settings(&self, index: &str) -> VectorResult<Value> {
        self.with_index(index, |stored| {
            Ok(json!({ index: { "settings": stored.body["settings"].clone() } }))
        })
    }
}

/// Deterministic bag-of-words embedder: each word bumps one of `DIM` buckets
pub struct KeywordEmbedder {
    calls: Mutex<Vec<(String, Option<EmbeddingAction>)>>,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Option<EmbeddingAction>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; DIM];
        for word in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % DIM as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str, action: Option<EmbeddingAction>) -> VectorResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(VectorError::Validation("Cannot embed empty text".to_string()));
        }
        self.calls.lock().unwrap().push((text.to_string(), action));
        Ok(Self::vector_for(text))
    }
}

pub fn adapter(index: &InMemoryIndex) -> VectorStoreAdapter<InMemoryIndex> {
    VectorStoreAdapter::new(index.clone(), "memories", DIM)
}

pub fn payload(pairs: &[(&str, &str)]) -> Payload {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), (*value).into()))
        .collect()
}

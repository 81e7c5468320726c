//! Request bodies sent to the index.
//!
//! Every document is stored as `{ "id", "vector_field", "payload" }`; the
//! builders here are the only place that knows this layout.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::filter::{SearchFilter, filter_clauses};
use crate::models::{Payload, payload_to_json};

pub const VECTOR_FIELD: &str = "vector_field";
pub const ID_FIELD: &str = "id";
pub const PAYLOAD_FIELD: &str = "payload";

/// Painless source for the fallback strategy. The `+ 1.0` keeps scores non-negative.
pub const COSINE_SCRIPT: &str =
    "cosineSimilarity(params.query_vector, doc['vector_field']) + 1.0";

/// Number of documents returned by diagnostics sampling
pub const SAMPLE_SIZE: usize = 3;

/// Page size used when listing without a limit
pub const LIST_PAGE_SIZE: usize = 500;

/// Query formulation used for similarity search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Approximate nearest neighbours with the filter applied inside the knn clause
    Knn,
    /// Exact cosine scoring over the filtered document set
    ScriptScore,
}

impl SearchStrategy {
    /// Strategies in the order they are attempted
    pub const ORDER: [SearchStrategy; 2] = [SearchStrategy::Knn, SearchStrategy::ScriptScore];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStrategy::Knn => "knn",
            SearchStrategy::ScriptScore => "script_score",
        }
    }

    pub fn build_query(&self, vector: &[f32], limit: usize, filter: Option<&SearchFilter>) -> Value {
        match self {
            SearchStrategy::Knn => knn_query(vector, limit, filter),
            SearchStrategy::ScriptScore => script_score_query(vector, limit, filter),
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn bool_filter(clauses: Vec<Value>) -> Value {
    json!({ "bool": { "filter": clauses } })
}

/// Top-`limit` nearest neighbours; filter clauses restrict the candidate set
/// before ranking.
pub fn knn_query(vector: &[f32], limit: usize, filter: Option<&SearchFilter>) -> Value {
    let mut knn = json!({
        "vector": vector,
        "k": limit,
    });

    let clauses = filter_clauses(filter);
    if !clauses.is_empty() {
        knn["filter"] = bool_filter(clauses);
    }

    json!({
        "size": limit,
        "_source": { "excludes": [VECTOR_FIELD] },
        "query": { "knn": { VECTOR_FIELD: knn } },
    })
}

/// Exact cosine scoring over the documents matching the filter.
pub fn script_score_query(vector: &[f32], limit: usize, filter: Option<&SearchFilter>) -> Value {
    let clauses = filter_clauses(filter);
    let inner = if clauses.is_empty() {
        json!({ "match_all": {} })
    } else {
        bool_filter(clauses)
    };

    json!({
        "size": limit,
        "_source": { "excludes": [VECTOR_FIELD] },
        "query": {
            "script_score": {
                "query": inner,
                "script": {
                    "source": COSINE_SCRIPT,
                    "params": { "query_vector": vector },
                },
            },
        },
    })
}

/// One page of documents, or of those matching the filter, ordered by `_id`.
///
/// `after` is the last `_id` of the previous page.
pub fn list_query(filter: Option<&SearchFilter>, size: usize, after: Option<&str>) -> Value {
    let clauses = filter_clauses(filter);
    let query = if clauses.is_empty() {
        json!({ "match_all": {} })
    } else {
        bool_filter(clauses)
    };

    let mut body = json!({
        "size": size,
        "query": query,
        "sort": [{ "_id": "asc" }],
    });
    if let Some(after) = after {
        body["search_after"] = json!([after]);
    }
    body
}

/// Find a record by id, matching either the document `_id` or the stored `id` field.
pub fn id_lookup_query(id: &str) -> Value {
    json!({
        "size": 1,
        "query": {
            "bool": {
                "should": [
                    { "ids": { "values": [id] } },
                    { "term": { ID_FIELD: id } },
                ],
                "minimum_should_match": 1,
            },
        },
    })
}

pub fn sample_query(size: usize) -> Value {
    json!({ "size": size, "query": { "match_all": {} } })
}

/// Settings and mapping for a new collection
pub fn index_body(dimension: usize) -> Value {
    json!({
        "settings": { "index": { "knn": true } },
        "mappings": {
            "properties": {
                VECTOR_FIELD: {
                    "type": "knn_vector",
                    "dimension": dimension,
                    "method": {
                        "name": "hnsw",
                        "space_type": "cosinesimil",
                        "engine": "lucene",
                    },
                },
                PAYLOAD_FIELD: { "type": "object" },
                ID_FIELD: { "type": "keyword" },
            },
        },
    })
}

/// Full document for a new record. Without an id the stored `id` field is omitted.
pub fn document(id: Option<&str>, vector: &[f32], payload: &Payload) -> Value {
    let mut doc = json!({
        VECTOR_FIELD: vector,
        PAYLOAD_FIELD: payload_to_json(payload),
    });
    if let Some(id) = id {
        doc[ID_FIELD] = json!(id);
    }
    doc
}

/// Partial document for an update, or `None` when there is nothing to change.
pub fn partial_document(vector: Option<&[f32]>, payload: Option<&Payload>) -> Option<Value> {
    let mut doc = serde_json::Map::new();
    if let Some(vector) = vector {
        doc.insert(VECTOR_FIELD.to_string(), json!(vector));
    }
    if let Some(payload) = payload {
        doc.insert(PAYLOAD_FIELD.to_string(), payload_to_json(payload));
    }

    if doc.is_empty() {
        None
    } else {
        Some(Value::Object(doc))
    }
}

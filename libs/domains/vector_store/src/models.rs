use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::{VectorError, VectorResult};
use crate::filter::SearchFilter;

/// A single payload value.
///
/// Values read back exactly as they were written. Timestamps are stored as
/// RFC 3339 text; see [`PayloadValue::as_timestamp`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// A JSON array or object, kept as is
    Nested(serde_json::Value),
}

impl PayloadValue {
    /// Convert a JSON value; `null` has no payload representation.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(PayloadValue::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(PayloadValue::Integer(i))
                } else {
                    n.as_f64().map(PayloadValue::Float)
                }
            }
            serde_json::Value::String(s) => Some(PayloadValue::Text(s)),
            nested => Some(PayloadValue::Nested(nested)),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PayloadValue::Text(s) => serde_json::Value::String(s.clone()),
            PayloadValue::Integer(i) => serde_json::Value::from(*i),
            PayloadValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            PayloadValue::Bool(b) => serde_json::Value::Bool(*b),
            PayloadValue::Nested(value) => value.clone(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PayloadValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text that parses as RFC 3339, in UTC
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        let text = self.as_str()?;
        DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Reason this value would not survive a write and read back, if any
    fn storage_problem(&self) -> Option<&'static str> {
        match self {
            PayloadValue::Float(f) if !f.is_finite() => Some("non-finite number"),
            PayloadValue::Nested(value) if !(value.is_array() || value.is_object()) => {
                Some("nested value must be an array or object")
            }
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for PayloadValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        PayloadValue::from_json(value)
            .ok_or_else(|| de::Error::custom("null is not a valid payload value"))
    }
}

impl fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadValue::Text(s) => f.write_str(s),
            PayloadValue::Integer(i) => write!(f, "{}", i),
            PayloadValue::Float(v) => write!(f, "{}", v),
            PayloadValue::Bool(b) => write!(f, "{}", b),
            PayloadValue::Nested(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        PayloadValue::Text(value.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        PayloadValue::Text(value)
    }
}

impl From<i64> for PayloadValue {
    fn from(value: i64) -> Self {
        PayloadValue::Integer(value)
    }
}

impl From<f64> for PayloadValue {
    fn from(value: f64) -> Self {
        PayloadValue::Float(value)
    }
}

impl From<bool> for PayloadValue {
    fn from(value: bool) -> Self {
        PayloadValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for PayloadValue {
    fn from(value: DateTime<Utc>) -> Self {
        PayloadValue::Text(value.to_rfc3339())
    }
}

/// Metadata stored next to a vector
pub type Payload = HashMap<String, PayloadValue>;

/// Convert an index `_source.payload` object, dropping `null` entries.
pub fn payload_from_json(value: serde_json::Value) -> Payload {
    match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .filter_map(|(key, val)| PayloadValue::from_json(val).map(|v| (key, v)))
            .collect(),
        _ => Payload::new(),
    }
}

/// Every value must read back unchanged once stored.
pub fn validate_payload(payload: &Payload) -> VectorResult<()> {
    let mut keys: Vec<&String> = payload.keys().collect();
    keys.sort();
    for key in keys {
        if let Some(problem) = payload[key].storage_problem() {
            return Err(VectorError::Validation(format!(
                "payload key '{}': {}",
                key, problem
            )));
        }
    }
    Ok(())
}

pub fn payload_to_json(payload: &Payload) -> serde_json::Value {
    serde_json::Value::Object(
        payload
            .iter()
            .map(|(key, val)| (key.clone(), val.to_json()))
            .collect(),
    )
}

/// One stored unit: id, vector and payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    /// `None` when the index did not return the stored vector
    pub vector: Option<Vec<f32>>,
    pub payload: Payload,
}

impl Record {
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector: Some(vector),
            payload: Payload::new(),
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }
}

/// Similarity query against the collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub vector: Vec<f32>,
    pub limit: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<SearchFilter>,
}

impl SearchQuery {
    pub fn new(vector: Vec<f32>, limit: usize) -> Self {
        Self {
            vector,
            limit,
            filter: None,
        }
    }

    /// An empty filter is the same as no filter.
    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = if filter.is_empty() { None } else { Some(filter) };
        self
    }
}

/// Search hit.
///
/// The score scale depends on the strategy that produced it: engine KNN
/// score for [`SearchStrategy::Knn`](crate::query::SearchStrategy::Knn),
/// `cosine + 1.0` for the script-score fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub score: f32,
    pub payload: Payload,
}

/// How a search was answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum SearchStatus {
    /// The KNN query succeeded
    Primary,
    /// The KNN query was rejected and the script-score query answered
    Fallback,
    /// Both strategies failed; results are empty
    Failed(String),
}

impl SearchStatus {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, SearchStatus::Primary)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SearchStatus::Failed(_))
    }
}

/// Search results plus the status that distinguishes "no matches" from "query failed"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    #[serde(flatten)]
    pub status: SearchStatus,
}

impl SearchOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            status: SearchStatus::Failed(reason.into()),
        }
    }
}

/// Snapshot of an index for troubleshooting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDiagnostics {
    pub collection: String,
    pub mapping: serde_json::Value,
    pub settings: serde_json::Value,
    pub total_docs: u64,
    pub sample_docs: Vec<Record>,
}

/// What an embedding will be used for.
///
/// Accepted by embedding providers for routing; the request shape does not
/// change with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingAction {
    Add,
    Search,
    Update,
}

impl EmbeddingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingAction::Add => "add",
            EmbeddingAction::Search => "search",
            EmbeddingAction::Update => "update",
        }
    }
}

//! Payload filters and their translation into index term clauses.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

/// Payload keys that can be filtered on.
///
/// Ordering follows declaration order, which fixes the order of generated clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    UserId,
    RunId,
    AgentId,
}

impl FilterKey {
    pub const ALL: [FilterKey; 3] = [FilterKey::UserId, FilterKey::RunId, FilterKey::AgentId];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::UserId => "user_id",
            FilterKey::RunId => "run_id",
            FilterKey::AgentId => "agent_id",
        }
    }

    /// Keyword sub-field the term clause targets
    pub fn field(&self) -> String {
        format!("payload.{}.keyword", self.as_str())
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown filter key '{}'", s))
    }
}

/// Exact-match constraints on payload identifiers, combined with AND.
///
/// Empty values are never stored, so every entry produces exactly one clause.
/// Deserializing applies the same rules as [`SearchFilter::from_pairs`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SearchFilter {
    terms: BTreeMap<FilterKey, String>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from loose key/value pairs. Unknown keys and empty values are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut filter = Self::new();
        for (key, value) in pairs {
            if let Ok(key) = key.as_ref().parse::<FilterKey>() {
                filter.set(key, value);
            }
        }
        filter
    }

    /// Set a constraint; an empty value removes it.
    pub fn set(&mut self, key: FilterKey, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.terms.remove(&key);
        } else {
            self.terms.insert(key, value);
        }
    }

    pub fn with(mut self, key: FilterKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn user_id(self, value: impl Into<String>) -> Self {
        self.with(FilterKey::UserId, value)
    }

    pub fn run_id(self, value: impl Into<String>) -> Self {
        self.with(FilterKey::RunId, value)
    }

    pub fn agent_id(self, value: impl Into<String>) -> Self {
        self.with(FilterKey::AgentId, value)
    }

    pub fn get(&self, key: FilterKey) -> Option<&str> {
        self.terms.get(&key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// One `term` clause per constraint, in key order.
    pub fn term_clauses(&self) -> Vec<Value> {
        self.terms
            .iter()
            .map(|(key, value)| json!({ "term": { (key.field()): value } }))
            .collect()
    }
}

impl<'de> Deserialize<'de> for SearchFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let pairs = raw.into_iter().filter_map(|(key, value)| match value {
            Value::String(s) => Some((key, s)),
            Value::Number(n) => Some((key, n.to_string())),
            Value::Bool(b) => Some((key, b.to_string())),
            _ => None,
        });
        Ok(SearchFilter::from_pairs(pairs))
    }
}

/// Clauses for an optional filter
pub fn filter_clauses(filter: Option<&SearchFilter>) -> Vec<Value> {
    filter.map(SearchFilter::term_clauses).unwrap_or_default()
}

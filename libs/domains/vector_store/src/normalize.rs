//! Flattening of listing responses.
//!
//! Some clients return hits as a flat list, others wrap the same hits in a
//! single nested list. Both shapes deserialize into `Vec<Listing<T>>` and
//! [`flatten_listing`] turns either into one ordered sequence.

use serde::{Deserialize, Serialize};

/// One element of a raw listing: either an item or a nested list of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Nested(Vec<T>),
    Item(T),
}

/// Normalize a raw listing.
///
/// - empty → empty
/// - first element nested → that inner list, one level unwrapped
/// - otherwise → the top-level items in order
pub fn flatten_listing<T>(raw: Vec<Listing<T>>) -> Vec<T> {
    let mut entries = raw.into_iter().peekable();

    if let Some(Listing::Nested(_)) = entries.peek() {
        return match entries.next() {
            Some(Listing::Nested(inner)) => inner,
            _ => Vec::new(),
        };
    }

    entries
        .filter_map(|entry| match entry {
            Listing::Item(item) => Some(item),
            Listing::Nested(_) => None,
        })
        .collect()
}

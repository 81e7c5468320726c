//! Shared test utilities for domain testing
//!
//! - `http::serve_once`, `http::serve_delayed`: axum stub server for client tests (always available)
//! - `TestOpenSearch`: OpenSearch container with automatic cleanup (feature: "opensearch")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Features
//!
//! - `opensearch`: Enables the OpenSearch testcontainer
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["opensearch"] }
//! ```
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestOpenSearch};
//!
//! #[tokio::test]
//! #[ignore = "requires docker"]
//! async fn my_index_test() {
//!     let search = TestOpenSearch::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_index_test");
//!     let index = builder.index_name("memories");
//! }
//! ```

pub mod http;

#[cfg(feature = "opensearch")]
mod opensearch;

#[cfg(feature = "opensearch")]
pub use opensearch::TestOpenSearch;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_insert_and_get");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Index names must be lowercase and may not contain most punctuation
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let name = TestDataBuilder::new(7).index_name("memories");
    /// assert_eq!(name, "test-memories-7");
    /// ```
    pub fn index_name(&self, prefix: &str) -> String {
        format!("test-{}-{}", prefix.to_ascii_lowercase(), self.seed)
    }

    /// Deterministic record id
    pub fn record_id(&self, suffix: &str) -> String {
        format!("rec-{}-{}", self.seed, suffix)
    }

    /// Deterministic vector of `dimension` values in `[-1, 1)`
    pub fn vector(&self, dimension: usize, salt: u64) -> Vec<f32> {
        let mut state = self.seed ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        (0..dimension)
            .map(|_| {
                // xorshift64
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                ((state % 2000) as f32 / 1000.0) - 1.0
            })
            .collect()
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert scores are in non-increasing order
    pub fn assert_descending(scores: &[f32], context: &str) {
        for pair in scores.windows(2) {
            assert!(
                pair[0] >= pair[1],
                "{}: scores not descending: {:?}",
                context,
                scores
            );
        }
    }
}

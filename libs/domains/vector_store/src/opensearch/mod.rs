mod client;
mod config;

pub use client::{IndexClient, OpenSearchClient};
pub use config::{DEFAULT_DIMENSION, OpenSearchConfig, RefreshPolicy};

#[cfg(test)]
pub use client::MockIndexClient;

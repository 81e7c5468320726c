//! Memory store CLI
//!
//! Operator tool for the OpenSearch memory collection: create and reset the
//! index, add and search text records, inspect what is stored.
//!
//! ## Modules
//!
//! - `cli`: argument definitions
//! - `commands`: command execution against the store
//!
//! ## Configuration
//!
//! Index settings come from `OPENSEARCH_*` variables; `EMBEDDING_ENDPOINT`
//! is only needed by commands that embed text (`add`, `search`, `update`).

pub mod cli;
pub mod commands;

pub use commands::run;

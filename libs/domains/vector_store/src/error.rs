use core_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorError {
    /// Text could not be turned into a vector
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// A vector failed the dimension/completeness check before reaching the index
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// The index could not be reached (connection refused, TLS, timeout)
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// The index answered but rejected the request
    #[error("Index rejected request ({status}): {reason}")]
    Index { status: u16, reason: String },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type VectorResult<T> = Result<T, VectorError>;

impl VectorError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            VectorError::IndexUnavailable(_) => true,
            VectorError::Index { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Status code reported by the index, if the index answered at all.
    pub fn index_status(&self) -> Option<u16> {
        match self {
            VectorError::Index { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Map a transport error talking to the index.
    ///
    /// Timeouts fall in the same bucket as connection failures.
    pub fn from_index_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            VectorError::IndexUnavailable(format!("request timed out: {}", err))
        } else {
            VectorError::IndexUnavailable(err.to_string())
        }
    }
}

/// Transport errors default to the embedding bucket; the index client maps
/// its own errors through [`VectorError::from_index_transport`].
impl From<reqwest::Error> for VectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            VectorError::Embedding(format!("request timed out: {}", err))
        } else {
            VectorError::Embedding(err.to_string())
        }
    }
}

impl From<serde_json::Error> for VectorError {
    fn from(err: serde_json::Error) -> Self {
        VectorError::Internal(format!("JSON error: {}", err))
    }
}

impl From<ConfigError> for VectorError {
    fn from(err: ConfigError) -> Self {
        VectorError::Config(err.to_string())
    }
}

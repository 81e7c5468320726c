use std::fmt;
use std::str::FromStr;

use core_config::{ConfigError, FromEnv, env_flag, env_optional, env_or_default, env_parse};

pub const DEFAULT_DIMENSION: usize = 384;
const DEFAULT_PORT: u16 = 9200;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// When writes become visible to searches.
///
/// Lookups by id read in real time under every policy. `list` and similarity
/// search only see a write once its shard refreshes, so with
/// [`RefreshPolicy::None`] a record can be missing from them right after it
/// was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Refresh the affected shards immediately
    #[default]
    Immediate,
    /// Block until the next scheduled refresh
    WaitFor,
    /// Leave it to the index refresh interval
    None,
}

impl RefreshPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshPolicy::Immediate => "true",
            RefreshPolicy::WaitFor => "wait_for",
            RefreshPolicy::None => "false",
        }
    }
}

impl fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "immediate" => Ok(RefreshPolicy::Immediate),
            "wait_for" => Ok(RefreshPolicy::WaitFor),
            "false" | "none" => Ok(RefreshPolicy::None),
            other => Err(format!("unknown refresh policy '{}'", other)),
        }
    }
}

/// OpenSearch connection and collection configuration
#[derive(Clone)]
pub struct OpenSearchConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_ssl: bool,
    pub verify_certs: bool,
    pub collection_name: String,
    pub dimension: usize,
    pub timeout_secs: u64,
    pub refresh: RefreshPolicy,
}

impl OpenSearchConfig {
    pub fn new(host: impl Into<String>, collection_name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            collection_name: collection_name.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    pub fn with_ssl(mut self, use_ssl: bool, verify_certs: bool) -> Self {
        self.use_ssl = use_ssl;
        self.verify_certs = verify_certs;
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    /// `http(s)://host:port`; a host that already carries a scheme is kept as-is.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            return format!("{}:{}", host, self.port);
        }
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, host, self.port)
    }
}

impl FromEnv for OpenSearchConfig {
    /// Every variable is optional:
    /// - `OPENSEARCH_HOST` (localhost), `OPENSEARCH_PORT` (9200)
    /// - `OPENSEARCH_USER`, `OPENSEARCH_PASSWORD`
    /// - `OPENSEARCH_USE_SSL` (false), `OPENSEARCH_VERIFY_CERTS` (true)
    /// - `OPENSEARCH_INDEX` (memories), `OPENSEARCH_DIMENSION` (384)
    /// - `OPENSEARCH_TIMEOUT_SECS` (30), `OPENSEARCH_REFRESH` (true)
    fn from_env() -> Result<Self, ConfigError> {
        let refresh = env_or_default("OPENSEARCH_REFRESH", "true")
            .parse::<RefreshPolicy>()
            .map_err(|details| ConfigError::ParseError {
                key: "OPENSEARCH_REFRESH".to_string(),
                details,
            })?;

        Ok(Self {
            host: env_or_default("OPENSEARCH_HOST", "localhost"),
            port: env_parse("OPENSEARCH_PORT", DEFAULT_PORT)?,
            username: env_optional("OPENSEARCH_USER"),
            password: env_optional("OPENSEARCH_PASSWORD"),
            use_ssl: env_flag("OPENSEARCH_USE_SSL", false)?,
            verify_certs: env_flag("OPENSEARCH_VERIFY_CERTS", true)?,
            collection_name: env_or_default("OPENSEARCH_INDEX", "memories"),
            dimension: env_parse("OPENSEARCH_DIMENSION", DEFAULT_DIMENSION)?,
            timeout_secs: env_parse("OPENSEARCH_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            refresh,
        })
    }
}

impl Default for OpenSearchConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            use_ssl: false,
            verify_certs: true,
            collection_name: "memories".to_string(),
            dimension: DEFAULT_DIMENSION,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            refresh: RefreshPolicy::default(),
        }
    }
}

// Keeps the password out of logs
impl fmt::Debug for OpenSearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenSearchConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("use_ssl", &self.use_ssl)
            .field("verify_certs", &self.verify_certs)
            .field("collection_name", &self.collection_name)
            .field("dimension", &self.dimension)
            .field("timeout_secs", &self.timeout_secs)
            .field("refresh", &self.refresh)
            .finish()
    }
}

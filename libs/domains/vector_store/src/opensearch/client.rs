use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{OpenSearchConfig, RefreshPolicy};
use crate::error::{VectorError, VectorResult};

/// Raw operations against the search index.
///
/// Bodies go in and come out as JSON; the adapter owns their shape.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IndexClient: Send + Sync {
    async fn index_exists(&self, index: &str) -> VectorResult<bool>;

    /// Create an index. An index that already exists is not an error.
    async fn create_index(&self, index: &str, body: Value) -> VectorResult<()>;

    /// Returns `false` when there was no such index
    async fn delete_index(&self, index: &str) -> VectorResult<bool>;

    /// Names of all indices, sorted
    async fn list_indices(&self) -> VectorResult<Vec<String>>;

    /// Store a document, returning its `_id`. Without an id the index assigns one.
    async fn index_document(
        &self,
        index: &str,
        id: Option<String>,
        document: Value,
    ) -> VectorResult<String>;

    /// Realtime `GET` of a document by `_id`: the response with `_id` and
    /// `_source`, or `None` when the document or the index is missing
    async fn get_document(&self, index: &str, doc_id: &str) -> VectorResult<Option<Value>>;

    /// Merge `partial` into an existing document
    async fn update_document(&self, index: &str, doc_id: &str, partial: Value) -> VectorResult<()>;

    /// Returns `false` when there was no such document
    async fn delete_document(&self, index: &str, doc_id: &str) -> VectorResult<bool>;

    /// Run a `_search` request and return the raw response
    async fn search(&self, index: &str, body: Value) -> VectorResult<Value>;

    async fn count(&self, index: &str) -> VectorResult<u64>;

    async fn get_mapping(&self, index: &str) -> VectorResult<Value>;

    async fn get_settings(&self, index: &str) -> VectorResult<Value>;
}

/// OpenSearch REST client
#[derive(Clone)]
pub struct OpenSearchClient {
    http: Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
    refresh: RefreshPolicy,
}

impl OpenSearchClient {
    pub fn new(config: &OpenSearchConfig) -> VectorResult<Self> {
        Self::with_base_url(&config.base_url(), config)
    }

    /// Connect to `base_url` using the remaining settings from `config`.
    pub fn with_base_url(base_url: &str, config: &OpenSearchConfig) -> VectorResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| VectorError::Config(format!("Invalid index URL '{}': {}", base_url, e)))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_certs)
            .build()
            .map_err(|e| VectorError::Config(format!("Failed to build HTTP client: {}", e)))?;

        if !config.verify_certs {
            warn!("TLS certificate verification is disabled for the index connection");
        }

        Ok(Self {
            http,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
            refresh: config.refresh,
        })
    }

    fn url(&self, segments: &[&str]) -> VectorResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| VectorError::Config(format!("Index URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> VectorResult<RequestBuilder> {
        let url = self.url(segments)?;
        debug!(%method, %url, "Index request");

        let mut request = self.http.request(method, url);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }
        Ok(request)
    }

    fn write_request(&self, method: Method, segments: &[&str]) -> VectorResult<RequestBuilder> {
        Ok(self
            .request(method, segments)?
            .query(&[("refresh", self.refresh.as_str())]))
    }

    async fn execute(request: RequestBuilder) -> VectorResult<(StatusCode, String)> {
        let response = request
            .send()
            .await
            .map_err(VectorError::from_index_transport)?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(VectorError::from_index_transport)?;
        Ok((status, body))
    }

    /// Send and decode a 2xx JSON response; anything else is an index error.
    async fn send_json(request: RequestBuilder) -> VectorResult<Value> {
        let (status, body) = Self::execute(request).await?;
        if !status.is_success() {
            return Err(index_error(status, &body));
        }
        parse_body(&body)
    }
}

fn parse_body(body: &str) -> VectorResult<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body)
        .map_err(|e| VectorError::Internal(format!("Malformed index response: {}", e)))
}

/// `error.type` from an OpenSearch error body
fn error_type(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json["error"]["type"].as_str().map(str::to_string)
}

fn index_error(status: StatusCode, body: &str) -> VectorError {
    let reason = match serde_json::from_str::<Value>(body) {
        Ok(json) => match &json["error"] {
            Value::Object(err) => {
                let kind = err.get("type").and_then(Value::as_str).unwrap_or("error");
                let reason = err.get("reason").and_then(Value::as_str).unwrap_or_default();
                format!("{}: {}", kind, reason)
            }
            Value::String(message) => message.clone(),
            _ => body.to_string(),
        },
        Err(_) => body.to_string(),
    };

    VectorError::Index {
        status: status.as_u16(),
        reason,
    }
}

#[async_trait]
impl IndexClient for OpenSearchClient {
    async fn index_exists(&self, index: &str) -> VectorResult<bool> {
        let (status, body) = Self::execute(self.request(Method::HEAD, &[index])?).await?;
        match status {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(index_error(status, &body)),
        }
    }

    async fn create_index(&self, index: &str, body: Value) -> VectorResult<()> {
        let request = self.request(Method::PUT, &[index])?.json(&body);
        let (status, response) = Self::execute(request).await?;

        if status.is_success() {
            return Ok(());
        }
        if error_type(&response).as_deref() == Some("resource_already_exists_exception") {
            debug!(index, "Index already exists");
            return Ok(());
        }
        Err(index_error(status, &response))
    }

    async fn delete_index(&self, index: &str) -> VectorResult<bool> {
        let (status, body) = Self::execute(self.request(Method::DELETE, &[index])?).await?;
        match status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(index_error(status, &body)),
        }
    }

    async fn list_indices(&self) -> VectorResult<Vec<String>> {
        let response = Self::send_json(self.request(Method::GET, &["_alias"])?).await?;

        let mut names: Vec<String> = match response {
            Value::Object(map) => map.into_iter().map(|(name, _)| name).collect(),
            Value::Null => Vec::new(),
            other => {
                return Err(VectorError::Internal(format!(
                    "Unexpected _alias response: {}",
                    other
                )));
            }
        };
        names.sort();
        Ok(names)
    }

    async fn index_document(
        &self,
        index: &str,
        id: Option<String>,
        document: Value,
    ) -> VectorResult<String> {
        let request = match &id {
            Some(id) => self.write_request(Method::PUT, &[index, "_doc", id.as_str()])?,
            None => self.write_request(Method::POST, &[index, "_doc"])?,
        };

        let response = Self::send_json(request.json(&document)).await?;
        response["_id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| VectorError::Internal("Index response carried no _id".to_string()))
    }

    async fn get_document(&self, index: &str, doc_id: &str) -> VectorResult<Option<Value>> {
        let request = self.request(Method::GET, &[index, "_doc", doc_id])?;
        let (status, body) = Self::execute(request).await?;
        match status {
            s if s.is_success() => {
                let response = parse_body(&body)?;
                if response["found"] == true {
                    Ok(Some(response))
                } else {
                    Ok(None)
                }
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(index_error(status, &body)),
        }
    }

    async fn update_document(&self, index: &str, doc_id: &str, partial: Value) -> VectorResult<()> {
        let request = self
            .write_request(Method::POST, &[index, "_update", doc_id])?
            .json(&json!({ "doc": partial }));
        Self::send_json(request).await?;
        Ok(())
    }

    async fn delete_document(&self, index: &str, doc_id: &str) -> VectorResult<bool> {
        let request = self.write_request(Method::DELETE, &[index, "_doc", doc_id])?;
        let (status, body) = Self::execute(request).await?;
        match status {
            s if s.is_success() => Ok(parse_body(&body)?["result"] == "deleted"),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(index_error(status, &body)),
        }
    }

    async fn search(&self, index: &str, body: Value) -> VectorResult<Value> {
        let request = self.request(Method::POST, &[index, "_search"])?.json(&body);
        Self::send_json(request).await
    }

    async fn count(&self, index: &str) -> VectorResult<u64> {
        let response = Self::send_json(self.request(Method::GET, &[index, "_count"])?).await?;
        response["count"]
            .as_u64()
            .ok_or_else(|| VectorError::Internal("Count response carried no count".to_string()))
    }

    async fn get_mapping(&self, index: &str) -> VectorResult<Value> {
        Self::send_json(self.request(Method::GET, &[index, "_mapping"])?).await
    }

    async fn get_settings(&self, index: &str) -> VectorResult<Value> {
        Self::send_json(self.request(Method::GET, &[index, "_settings"])?).await
    }
}

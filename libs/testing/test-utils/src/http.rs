//! Local HTTP stub for client tests
//!
//! An axum router on an ephemeral port answers every request with a canned
//! JSON response and hands back the first request it received.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

/// A request received by the stub
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    /// Path including the query string
    pub path: String,
    /// Header names are lowercased
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Body parsed as JSON, `Null` when empty
    pub fn json(&self) -> serde_json::Value {
        if self.body.is_empty() {
            return serde_json::Value::Null;
        }
        serde_json::from_str(&self.body).expect("request body is not JSON")
    }
}

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    body: String,
    delay: Duration,
    first: Arc<Mutex<Option<oneshot::Sender<CapturedRequest>>>>,
}

async fn respond(
    State(stub): State<Stub>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = CapturedRequest {
        method: method.to_string(),
        path: uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        headers: headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    debug!(method = %request.method, path = %request.path, "Stub received request");

    let sender = stub.first.lock().ok().and_then(|mut first| first.take());
    if let Some(sender) = sender {
        let _ = sender.send(request);
    }

    if !stub.delay.is_zero() {
        tokio::time::sleep(stub.delay).await;
    }

    (
        stub.status,
        [(header::CONTENT_TYPE, "application/json")],
        stub.body,
    )
        .into_response()
}

/// Answer with `status` and `body`.
///
/// Returns the base URL (`http://127.0.0.1:<port>`) and a handle resolving to
/// the first captured request.
pub async fn serve_once(status: u16, body: String) -> (String, JoinHandle<CapturedRequest>) {
    serve_delayed(Duration::ZERO, status, body).await
}

/// Like [`serve_once`], but every response is held back for `delay`.
pub async fn serve_delayed(
    delay: Duration,
    status: u16,
    body: String,
) -> (String, JoinHandle<CapturedRequest>) {
    let (sender, receiver) = oneshot::channel();
    let stub = Stub {
        status: StatusCode::from_u16(status).expect("Invalid status code"),
        body,
        delay,
        first: Arc::new(Mutex::new(Some(sender))),
    };
    let router = Router::new().fallback(respond).with_state(stub);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router.into_make_service()).await {
            tracing::error!("Stub server stopped: {:?}", e);
        }
    });

    let handle = tokio::spawn(async move { receiver.await.expect("No request received") });

    (format!("http://{}", addr), handle)
}

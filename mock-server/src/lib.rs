//! Echo server used to exercise the request builder over real HTTP.
//!
//! Every request is answered with a JSON description of what arrived, so
//! tests can assert on the method, path, query, headers and body the client
//! actually sent.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::debug;

/// What the server saw.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EchoedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Request counters exposed on `/stats`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stats {
    pub requests: u64,
}

#[derive(Clone, Default)]
struct AppState {
    requests: Arc<AtomicU64>,
}

pub fn app() -> Router {
    Router::new()
        .route("/stats", get(stats))
        .route("/status/{code}", any(status))
        .fallback(echo)
        .with_state(AppState::default())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn record(state: &AppState, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> EchoedRequest {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let echoed = EchoedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    debug!(method = %echoed.method, path = %echoed.path, "echo");
    echoed
}

async fn echo(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Json<EchoedRequest> {
    Json(record(&state, method, uri, headers, body))
}

async fn status(
    State(state): State<AppState>,
    Path(code): Path<u16>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let echoed = record(&state, method, uri, headers, body);
    match StatusCode::from_u16(code) {
        Ok(status) => (status, Json(echoed)).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn stats(State(state): State<AppState>) -> Json<Stats> {
    Json(Stats {
        requests: state.requests.load(Ordering::SeqCst),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoed_request_serializes_to_json() {
        let echoed = EchoedRequest {
            method: "GET".to_string(),
            path: "/x".to_string(),
            query: Some("a=1".to_string()),
            headers: BTreeMap::from([("accept".to_string(), "*/*".to_string())]),
            body: String::new(),
        };
        let json = serde_json::to_value(&echoed).unwrap();
        assert_eq!(json["method"], "GET");
        assert_eq!(json["query"], "a=1");
        assert_eq!(json["headers"]["accept"], "*/*");
    }

    #[test]
    fn record_counts_and_captures() {
        let state = AppState::default();
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "text/plain".parse().unwrap());
        let echoed = record(
            &state,
            Method::POST,
            "/a/b?x=1".parse().unwrap(),
            headers,
            Bytes::from_static(b"hi"),
        );
        assert_eq!(echoed.method, "POST");
        assert_eq!(echoed.path, "/a/b");
        assert_eq!(echoed.query.as_deref(), Some("x=1"));
        assert_eq!(echoed.headers["content-type"], "text/plain");
        assert_eq!(echoed.body, "hi");
        assert_eq!(state.requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_query_is_none() {
        let echoed = record(
            &AppState::default(),
            Method::GET,
            "/plain".parse().unwrap(),
            HeaderMap::new(),
            Bytes::new(),
        );
        assert!(echoed.query.is_none());
    }
}

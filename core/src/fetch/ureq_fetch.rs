//! Built-in blocking transport on top of `ureq`.
//!
//! Inside a tokio runtime the blocking call goes to the runtime's blocking
//! pool. Under any other executor it runs inline on the polling thread.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ApiError;
use crate::http::{Headers, HttpRequest, HttpResponse};

use super::Fetch;

/// `Fetch` backed by a `ureq::Agent`.
///
/// 4xx/5xx statuses are returned as responses, not errors; status policy
/// belongs to the builder's callbacks.
///
/// Response bodies are read fully into memory and capped at
/// [`DEFAULT_BODY_LIMIT`] unless changed with [`UreqFetch::with_body_limit`].
/// A body over the cap fails the send with `ApiError::Transport`.
#[derive(Debug, Clone)]
pub struct UreqFetch {
    agent: ureq::Agent,
    body_limit: u64,
}

/// Largest response body read by default: 10 MiB, the same as `ureq`.
pub const DEFAULT_BODY_LIMIT: u64 = 10 * 1024 * 1024;

impl Default for UreqFetch {
    fn default() -> Self {
        Self::with_timeout(None)
    }
}

impl UreqFetch {
    /// Agent with an overall per-request timeout.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self {
            agent,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Change the largest response body this fetch will read, in bytes.
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }
}

#[async_trait]
impl Fetch for UreqFetch {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return execute(&self.agent, self.body_limit, request);
        };
        let agent = self.agent.clone();
        let limit = self.body_limit;
        handle
            .spawn_blocking(move || execute(&agent, limit, request))
            .await
            .map_err(ApiError::transport)?
    }
}

fn execute(agent: &ureq::Agent, body_limit: u64, request: HttpRequest) -> Result<HttpResponse, ApiError> {
    let mut builder = ureq::http::Request::builder()
        .method(request.method.as_str())
        .uri(request.path.as_str());
    for (name, value) in request.headers.iter() {
        builder = builder.header(name, value);
    }

    let mut response = match &request.body {
        Some(body) => {
            if !request.headers.contains("content-type") {
                if let Some(content_type) = body.content_type() {
                    builder = builder.header("content-type", content_type);
                }
            }
            let bytes = body.to_bytes()?;
            let req = builder.body(bytes.to_vec()).map_err(ApiError::transport)?;
            agent.run(req)
        }
        None => {
            let req = builder.body(()).map_err(ApiError::transport)?;
            agent.run(req)
        }
    }
    .map_err(ApiError::transport)?;

    let status = response.status().as_u16();
    let mut headers = Headers::new();
    for (name, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            headers.append(name.as_str(), value);
        }
    }
    let body = response
        .body_mut()
        .with_config()
        .limit(body_limit)
        .read_to_vec()
        .map_err(ApiError::transport)?;
    debug!(status, bytes = body.len(), "ureq response read");

    Ok(HttpResponse {
        status,
        headers,
        body: body.into(),
    })
}

//! Error types for the request builder.
//!
//! # Design
//! Every failure surfaces as an `ApiError` returned from the pending call;
//! nothing in this crate retries. Status-expectation failures keep the
//! offending response so callers can inspect its status and body.

use thiserror::Error;

use crate::http::HttpResponse;

/// Boxed error accepted from callbacks and transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned while building, sending, or decoding an API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The pending call was already sent once. Re-use the first response
    /// instead of issuing another request.
    #[error("called ApiCall twice; re-use the response instead of making multiple requests")]
    AlreadyConsumed,

    /// `expect_status` saw a different status code.
    #[error("expected {expected} response, got {}", .response.status)]
    UnexpectedStatus {
        expected: u16,
        response: Box<HttpResponse>,
    },

    /// `expect_success_status` saw a status outside `[200, 300)`.
    #[error("expected a successful response, got {}", .response.status)]
    UnsuccessfulStatus { response: Box<HttpResponse> },

    /// A response or json-response callback failed.
    #[error("response callback failed: {0}")]
    Callback(#[source] BoxError),

    /// The network primitive failed.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The request body could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The response body could not be deserialized.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// The response body is not valid UTF-8.
    #[error("response body is not valid UTF-8: {0}")]
    InvalidText(#[from] std::string::FromUtf8Error),

    /// An extra `method` option named something that is not an HTTP method.
    #[error("unknown HTTP method: {0}")]
    InvalidMethod(String),

    /// No fetch implementation is available to send the request.
    #[error("no fetch implementation configured")]
    NoFetch,
}

impl ApiError {
    /// Wrap an arbitrary error raised inside a response callback.
    pub fn callback(err: impl Into<BoxError>) -> Self {
        ApiError::Callback(err.into())
    }

    /// Wrap an arbitrary error raised by a transport.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        ApiError::Transport(err.into())
    }

    /// The response carried by a status-expectation failure.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            ApiError::UnexpectedStatus { response, .. } | ApiError::UnsuccessfulStatus { response } => {
                Some(response)
            }
            _ => None,
        }
    }
}

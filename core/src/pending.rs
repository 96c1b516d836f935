//! One-shot handle for a configured call.
//!
//! # Design
//! A `PendingCall` owns its `ApiCall` and an atomic `consumed` flag. The
//! first continuation swaps the flag and issues exactly one fetch; every
//! later continuation, through any method, fails with
//! [`ApiError::AlreadyConsumed`] without touching the network. Callbacks run
//! one at a time in registration order and the first failure stops the rest.

use std::future::IntoFuture;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::call::ApiCall;
use crate::error::ApiError;
use crate::fetch::global_fetch;
use crate::http::{HttpRequest, HttpResponse};

/// A call that has been configured and may be sent at most once.
#[derive(Debug)]
pub struct PendingCall {
    call: ApiCall,
    consumed: AtomicBool,
}

impl PendingCall {
    pub(crate) fn new(call: ApiCall) -> Self {
        Self {
            call,
            consumed: AtomicBool::new(false),
        }
    }

    /// The underlying configuration.
    pub fn call(&self) -> &ApiCall {
        &self.call
    }

    /// Describe the request. Still allowed after the call was sent.
    pub fn build(&self) -> Result<HttpRequest, ApiError> {
        self.call.build()
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed.load(Ordering::Acquire)
    }

    /// Send the request and run the response callbacks.
    pub async fn response(&self) -> Result<HttpResponse, ApiError> {
        if self.consumed.swap(true, Ordering::AcqRel) {
            warn!(path = %self.call.path(), "api call awaited more than once");
            return Err(ApiError::AlreadyConsumed);
        }

        for hook in &self.call.pre_build {
            hook();
        }
        let request = self.call.build()?;
        let fetch = match &self.call.fetch {
            Some(fetch) => fetch.clone(),
            None => global_fetch()?,
        };

        debug!(method = %request.method, path = %request.path, "sending request");
        let response = fetch.fetch(request).await?;
        debug!(status = response.status, "received response");

        for (idx, callback) in self.call.response_callbacks.iter().enumerate() {
            if let Err(err) = callback(response.clone()).await {
                debug!(callback = idx, error = %err, "response callback failed");
                return Err(err);
            }
        }
        Ok(response)
    }

    /// Failure-only continuation: hands the error to `on_error` and resolves
    /// to `None`, or resolves to the response.
    pub async fn catch<F>(&self, on_error: F) -> Option<HttpResponse>
    where
        F: FnOnce(ApiError),
    {
        match self.response().await {
            Ok(response) => Some(response),
            Err(err) => {
                on_error(err);
                None
            }
        }
    }

    /// Cleanup continuation: runs `cleanup` whatever the outcome, then
    /// returns the outcome.
    pub async fn finally<F>(&self, cleanup: F) -> Result<HttpResponse, ApiError>
    where
        F: FnOnce(),
    {
        let result = self.response().await;
        cleanup();
        result
    }

    pub async fn json<D: DeserializeOwned>(&self) -> Result<D, ApiError> {
        self.json_and_response().await.map(|(data, _)| data)
    }

    /// Parse the body as JSON and run the json-response callbacks on it.
    pub async fn json_and_response<D: DeserializeOwned>(&self) -> Result<(D, HttpResponse), ApiError> {
        let response = self.response().await?;
        let data: Value = response.json()?;

        for callback in &self.call.json_callbacks {
            callback(data.clone(), response.clone()).await?;
        }

        let data = serde_json::from_value(data).map_err(ApiError::Deserialization)?;
        Ok((data, response))
    }

    pub async fn text(&self) -> Result<String, ApiError> {
        self.text_and_response().await.map(|(text, _)| text)
    }

    pub async fn text_and_response(&self) -> Result<(String, HttpResponse), ApiError> {
        let response = self.response().await?;
        let text = response.text()?;
        Ok((text, response))
    }

    pub async fn bytes(&self) -> Result<Bytes, ApiError> {
        self.bytes_and_response().await.map(|(bytes, _)| bytes)
    }

    pub async fn bytes_and_response(&self) -> Result<(Bytes, HttpResponse), ApiError> {
        let response = self.response().await?;
        Ok((response.bytes(), response))
    }
}

impl<'a> IntoFuture for &'a PendingCall {
    type Output = Result<HttpResponse, ApiError>;
    type IntoFuture = BoxFuture<'a, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        self.response().boxed()
    }
}

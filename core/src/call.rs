//! The chainable request builder.
//!
//! # Design
//! `ApiCall` is an owned configuration value: every `with_*`, `expect_*` and
//! `on_*` method takes `self` and hands it back, so a chain reads
//! `get("/x").with_query(q).expect_success_status()`. Nothing is sent until
//! the builder is awaited or turned into a [`PendingCall`], which carries the
//! one-shot guard.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::auth::BearerToken;
use crate::error::ApiError;
use crate::fetch::Fetch;
use crate::http::{
    Body, FormData, Headers, HttpMethod, HttpRequest, HttpResponse, UrlEncoded,
    APPLICATION_FORM_URLENCODED, APPLICATION_JSON,
};
use crate::pending::PendingCall;
use crate::serialize::{
    apply_serialization_options, normalize_numbers, stringify_query, Query, SerializationOptions,
};

/// Callback run on every response, in registration order.
pub type ResponseCallback =
    Arc<dyn Fn(HttpResponse) -> BoxFuture<'static, Result<(), ApiError>> + Send + Sync>;

/// Callback run on the parsed body of `json()` calls, in registration order.
pub type JsonResponseCallback =
    Arc<dyn Fn(Value, HttpResponse) -> BoxFuture<'static, Result<(), ApiError>> + Send + Sync>;

/// Hook run right before the request is built for sending.
pub type PreBuildHook = Arc<dyn Fn() + Send + Sync>;

/// Configuration for a single HTTP call.
#[derive(Clone)]
pub struct ApiCall {
    path: String,
    method: HttpMethod,
    query: Option<Query>,
    query_options: SerializationOptions,
    bearer_token: Option<BearerToken>,
    content_type: Option<String>,
    headers: Option<Headers>,
    body: Option<Body>,
    body_options: SerializationOptions,
    extra: Map<String, Value>,
    pub(crate) pre_build: Vec<PreBuildHook>,
    pub(crate) response_callbacks: Vec<ResponseCallback>,
    pub(crate) json_callbacks: Vec<JsonResponseCallback>,
    pub(crate) fetch: Option<Arc<dyn Fetch>>,
}

impl fmt::Debug for ApiCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCall")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("query", &self.query)
            .field("content_type", &self.content_type)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("response_callbacks", &self.response_callbacks.len())
            .field("json_callbacks", &self.json_callbacks.len())
            .finish_non_exhaustive()
    }
}

impl ApiCall {
    pub fn new(path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: path.into(),
            method,
            query: None,
            query_options: SerializationOptions::default(),
            bearer_token: None,
            content_type: None,
            headers: None,
            body: None,
            body_options: SerializationOptions::default(),
            extra: Map::new(),
            pre_build: Vec::new(),
            response_callbacks: Vec::new(),
            json_callbacks: Vec::new(),
            fetch: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    pub fn bearer_token(&self) -> Option<&BearerToken> {
        self.bearer_token.as_ref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn headers(&self) -> Option<&Headers> {
        self.headers.as_ref()
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Replace the query map, with default serialization options.
    pub fn with_query(self, query: Query) -> Self {
        self.with_query_options(query, SerializationOptions::default())
    }

    /// Replace the query map and its serialization options.
    pub fn with_query_options(mut self, query: Query, options: SerializationOptions) -> Self {
        self.query = Some(query);
        self.query_options = options;
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<BearerToken>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Replace the whole header collection.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.get_or_insert_with(Headers::new).set(name, value);
        self
    }

    /// Store a body payload. With `json` set the content type becomes
    /// `application/json` and the payload is serialized at build time.
    pub fn with_body(mut self, body: impl Into<Body>, json: bool, options: SerializationOptions) -> Self {
        self.body = Some(body.into());
        self.body_options = options;
        if json {
            return self.with_content_type(APPLICATION_JSON);
        }
        self
    }

    pub fn with_json_body(self, body: impl Into<Value>) -> Self {
        self.with_body(body.into(), true, SerializationOptions::default())
    }

    pub fn with_json_body_options(self, body: impl Into<Value>, options: SerializationOptions) -> Self {
        self.with_body(body.into(), true, options)
    }

    /// Multipart body from a flat map; falsy values are skipped.
    pub fn with_form_data_body(self, data: &Query) -> Self {
        let mut form = FormData::new();
        for (key, value) in data.iter().filter(|(_, v)| v.is_truthy()) {
            form.append(key, value.to_string());
        }
        self.with_body(form, false, SerializationOptions::default())
    }

    /// URL-encoded body from a flat map; falsy values are skipped.
    pub fn with_url_encoded_body(self, data: &Query) -> Self {
        let mut encoded = UrlEncoded::new();
        for (key, value) in data.iter().filter(|(_, v)| v.is_truthy()) {
            encoded.append(key, value.to_string());
        }
        self.with_content_type(APPLICATION_FORM_URLENCODED)
            .with_body(encoded, false, SerializationOptions::default())
    }

    /// Merge options into the built request. String `path` and `method`
    /// entries override the computed ones; the rest land in `HttpRequest::extra`.
    pub fn with_extra_options(mut self, options: Map<String, Value>) -> Self {
        self.extra.extend(options);
        self
    }

    /// Send with this fetch instead of the global one.
    pub fn with_fetch(self, fetch: impl Fetch + 'static) -> Self {
        self.with_shared_fetch(Arc::new(fetch))
    }

    pub fn with_shared_fetch(mut self, fetch: Arc<dyn Fetch>) -> Self {
        self.fetch = Some(fetch);
        self
    }

    /// Fail the call unless the response status equals `code`.
    pub fn expect_status(self, code: u16) -> Self {
        self.on_response(move |response| async move {
            if response.status != code {
                return Err(ApiError::UnexpectedStatus {
                    expected: code,
                    response: Box::new(response),
                });
            }
            Ok(())
        })
    }

    /// Fail the call unless the response status is in `[200, 300)`.
    pub fn expect_success_status(self) -> Self {
        self.on_response(|response| async move {
            if !response.is_success() {
                return Err(ApiError::UnsuccessfulStatus {
                    response: Box::new(response),
                });
            }
            Ok(())
        })
    }

    pub fn on_response<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ApiError>> + Send + 'static,
    {
        self.response_callbacks
            .push(Arc::new(move |response: HttpResponse| callback(response).boxed()));
        self
    }

    pub fn on_json_response<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(Value, HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ApiError>> + Send + 'static,
    {
        self.json_callbacks
            .push(Arc::new(move |data: Value, response: HttpResponse| {
                callback(data, response).boxed()
            }));
        self
    }

    pub fn on_pre_build(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.pre_build.push(Arc::new(hook));
        self
    }

    pub(crate) fn push_response_callback(mut self, callback: ResponseCallback) -> Self {
        self.response_callbacks.push(callback);
        self
    }

    pub(crate) fn push_json_callback(mut self, callback: JsonResponseCallback) -> Self {
        self.json_callbacks.push(callback);
        self
    }

    pub(crate) fn push_pre_build(mut self, hook: PreBuildHook) -> Self {
        self.pre_build.push(hook);
        self
    }

    /// Describe the request without sending it. Repeatable.
    pub fn build(&self) -> Result<HttpRequest, ApiError> {
        let mut headers = self.headers.clone().unwrap_or_default();
        if let Some(value) = self.bearer_token.as_ref().and_then(BearerToken::header_value) {
            headers.set("authorization", value);
        }
        if let Some(content_type) = &self.content_type {
            headers.set("content-type", content_type.as_str());
        }

        let mut path = match &self.query {
            Some(query) => format!("{}?{}", self.path, stringify_query(query, self.query_options)),
            None => self.path.clone(),
        };

        let body = match &self.body {
            Some(Body::Json(value)) if self.content_type.as_deref() == Some(APPLICATION_JSON) => {
                let value = normalize_numbers(apply_serialization_options(value, self.body_options));
                Some(Body::Text(
                    serde_json::to_string(&value).map_err(ApiError::Serialization)?,
                ))
            }
            other => other.clone(),
        };

        let mut method = self.method;
        let mut extra = self.extra.clone();
        if let Some(Value::String(p)) = extra.remove("path") {
            path = p;
        }
        if let Some(Value::String(m)) = extra.remove("method") {
            method = m.parse().map_err(|_| ApiError::InvalidMethod(m))?;
        }

        Ok(HttpRequest {
            method,
            path,
            headers,
            body,
            extra,
        })
    }

    /// Wrap the configuration in a one-shot pending call.
    pub fn pending(self) -> PendingCall {
        PendingCall::new(self)
    }

    pub async fn json<D: DeserializeOwned>(self) -> Result<D, ApiError> {
        self.pending().json().await
    }

    pub async fn json_and_response<D: DeserializeOwned>(self) -> Result<(D, HttpResponse), ApiError> {
        self.pending().json_and_response().await
    }

    pub async fn text(self) -> Result<String, ApiError> {
        self.pending().text().await
    }

    pub async fn text_and_response(self) -> Result<(String, HttpResponse), ApiError> {
        self.pending().text_and_response().await
    }

    pub async fn bytes(self) -> Result<bytes::Bytes, ApiError> {
        self.pending().bytes().await
    }

    pub async fn bytes_and_response(self) -> Result<(bytes::Bytes, HttpResponse), ApiError> {
        self.pending().bytes_and_response().await
    }
}

impl IntoFuture for ApiCall {
    type Output = Result<HttpResponse, ApiError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        async move { self.pending().response().await }.boxed()
    }
}

/// A bare call with no base URL or transforms.
pub fn api_call(path: impl Into<String>, method: HttpMethod) -> ApiCall {
    ApiCall::new(path, method)
}

pub fn get(path: impl Into<String>) -> ApiCall {
    api_call(path, HttpMethod::Get)
}

pub fn post(path: impl Into<String>) -> ApiCall {
    api_call(path, HttpMethod::Post)
}

pub fn put(path: impl Into<String>) -> ApiCall {
    api_call(path, HttpMethod::Put)
}

pub fn patch(path: impl Into<String>) -> ApiCall {
    api_call(path, HttpMethod::Patch)
}

pub fn delete(path: impl Into<String>) -> ApiCall {
    api_call(path, HttpMethod::Delete)
}

pub fn head(path: impl Into<String>) -> ApiCall {
    api_call(path, HttpMethod::Head)
}

pub fn options(path: impl Into<String>) -> ApiCall {
    api_call(path, HttpMethod::Options)
}

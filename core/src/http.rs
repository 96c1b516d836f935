//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe requests and responses as plain data. The builder
//! produces an `HttpRequest`, a [`Fetch`](crate::Fetch) implementation turns
//! it into an `HttpResponse`, and nothing in between touches a socket.
//!
//! `Headers` lower-cases names on insertion, so lookups are
//! case-insensitive the same way a fetch `Headers` object is.

use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::error::ApiError;

/// Content type that switches the body to JSON serialization.
pub const APPLICATION_JSON: &str = "application/json";

/// Content type forced by `with_url_encoded_body`.
pub const APPLICATION_FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// HTTP method for a request.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// The method name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Case-insensitive header collection.
///
/// Names are stored lower-cased. `set` replaces every value for a name,
/// `append` adds another one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref().to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter().position(|(k, _)| *k == name) {
            Some(idx) => {
                self.entries[idx].1 = value;
                let mut seen = false;
                self.entries.retain(|(k, _)| {
                    if *k != name {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.entries.push((name, value)),
        }
    }

    pub fn append(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .push((name.as_ref().to_ascii_lowercase(), value.into()));
    }

    pub fn remove(&mut self, name: &str) {
        let name = name.to_ascii_lowercase();
        self.entries.retain(|(k, _)| *k != name);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.set(k, v);
        }
        headers
    }
}

/// `multipart/form-data` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormData {
    boundary: String,
    fields: Vec<(String, String)>,
}

impl Default for FormData {
    fn default() -> Self {
        Self {
            boundary: format!("----api-call-{}", Uuid::new_v4().simple()),
            fields: Vec::new(),
        }
    }
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encode the fields as a multipart body.
    pub fn encode(&self) -> Bytes {
        let mut out = String::new();
        for (name, value) in &self.fields {
            out.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary,
                name.replace('"', "%22"),
                value
            ));
        }
        out.push_str(&format!("--{}--\r\n", self.boundary));
        Bytes::from(out)
    }
}

/// `application/x-www-form-urlencoded` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlEncoded {
    pairs: Vec<(String, String)>,
}

impl UrlEncoded {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

impl fmt::Display for UrlEncoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish();
        f.write_str(&encoded)
    }
}

/// Request body payload.
///
/// `Json` is serialized when the request is built with a JSON content type;
/// every other variant is handed to the transport as is.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
    Bytes(Bytes),
    Form(FormData),
    UrlEncoded(UrlEncoded),
}

impl Body {
    /// Content type implied by the payload itself, used by transports when
    /// no explicit `content-type` header is set.
    pub fn content_type(&self) -> Option<String> {
        match self {
            Body::Json(_) => Some(APPLICATION_JSON.to_string()),
            Body::Text(_) => Some("text/plain;charset=UTF-8".to_string()),
            Body::Bytes(_) => None,
            Body::Form(form) => Some(form.content_type()),
            Body::UrlEncoded(_) => Some(format!("{APPLICATION_FORM_URLENCODED};charset=UTF-8")),
        }
    }

    /// Raw bytes to put on the wire.
    pub fn to_bytes(&self) -> Result<Bytes, ApiError> {
        Ok(match self {
            Body::Json(value) => serde_json::to_vec(value)
                .map_err(ApiError::Serialization)?
                .into(),
            Body::Text(text) => Bytes::from(text.clone()),
            Body::Bytes(bytes) => bytes.clone(),
            Body::Form(form) => form.encode(),
            Body::UrlEncoded(data) => Bytes::from(data.to_string()),
        })
    }

    /// The payload as text, when it is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Json(value)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(bytes.into())
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<FormData> for Body {
    fn from(form: FormData) -> Self {
        Body::Form(form)
    }
}

impl From<UrlEncoded> for Body {
    fn from(data: UrlEncoded) -> Self {
        Body::UrlEncoded(data)
    }
}

/// An HTTP request described as plain data.
///
/// Produced by `ApiCall::build`. `extra` carries the pass-through options set
/// with `with_extra_options` for transports that understand them.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Headers,
    pub body: Option<Body>,
    pub extra: Map<String, Value>,
}

/// An HTTP response described as plain data, with a fully buffered body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl HttpResponse {
    /// `true` when the status is in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<D: DeserializeOwned>(&self) -> Result<D, ApiError> {
        serde_json::from_slice(&self.body).map_err(ApiError::Deserialization)
    }

    pub fn text(&self) -> Result<String, ApiError> {
        Ok(String::from_utf8(self.body.to_vec())?)
    }

    pub fn bytes(&self) -> Bytes {
        self.body.clone()
    }
}

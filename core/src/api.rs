//! Factory for families of pre-configured calls.
//!
//! # Design
//! `Api` holds a base URL and an ordered list of transforms. Every
//! derivation (`with_transform`, `with_base_url`, `with_bearer_token`, ...)
//! returns a new factory and leaves the original untouched. The one in-place
//! mutation, `change_base_url`, only affects calls created afterwards.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;

use crate::auth::BearerToken;
use crate::call::{ApiCall, JsonResponseCallback, PreBuildHook, ResponseCallback};
use crate::error::ApiError;
use crate::fetch::Fetch;
use crate::http::{HttpMethod, HttpResponse};
use crate::path::build_path;

type TransformFn = Arc<dyn Fn(ApiCall) -> ApiCall + Send + Sync>;

/// A deferred change replayed against every call a factory creates.
#[derive(Clone)]
pub enum Transform {
    /// Applied to every call.
    All(TransformFn),
    /// Applied only to calls with this method.
    Method(HttpMethod, TransformFn),
}

impl Transform {
    pub fn all(f: impl Fn(ApiCall) -> ApiCall + Send + Sync + 'static) -> Self {
        Transform::All(Arc::new(f))
    }

    pub fn for_method(method: HttpMethod, f: impl Fn(ApiCall) -> ApiCall + Send + Sync + 'static) -> Self {
        Transform::Method(method, Arc::new(f))
    }

    fn apply(&self, call: ApiCall) -> ApiCall {
        match self {
            Transform::All(f) => f(call),
            Transform::Method(method, f) if *method == call.method() => f(call),
            Transform::Method(..) => call,
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::All(_) => f.write_str("Transform::All"),
            Transform::Method(method, _) => write!(f, "Transform::Method({method})"),
        }
    }
}

/// Factory remembering a base URL and the transforms for every call.
#[derive(Debug, Clone)]
pub struct Api {
    base_url: String,
    transforms: Vec<Transform>,
}

impl Api {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_transforms(base_url, Vec::new())
    }

    pub fn with_transforms(base_url: impl Into<String>, transforms: Vec<Transform>) -> Self {
        Self {
            base_url: base_url.into(),
            transforms,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    /// Create a call for `path` under the base URL, then replay the
    /// transforms against it in order.
    pub fn call(&self, path: &str, method: HttpMethod) -> ApiCall {
        let call = ApiCall::new(build_path(&[self.base_url.as_str(), path]), method);
        self.transforms
            .iter()
            .fold(call, |call, transform| transform.apply(call))
    }

    pub fn get(&self, path: &str) -> ApiCall {
        self.call(path, HttpMethod::Get)
    }

    pub fn post(&self, path: &str) -> ApiCall {
        self.call(path, HttpMethod::Post)
    }

    pub fn put(&self, path: &str) -> ApiCall {
        self.call(path, HttpMethod::Put)
    }

    pub fn patch(&self, path: &str) -> ApiCall {
        self.call(path, HttpMethod::Patch)
    }

    pub fn delete(&self, path: &str) -> ApiCall {
        self.call(path, HttpMethod::Delete)
    }

    pub fn head(&self, path: &str) -> ApiCall {
        self.call(path, HttpMethod::Head)
    }

    pub fn options(&self, path: &str) -> ApiCall {
        self.call(path, HttpMethod::Options)
    }

    pub fn with_transform(&self, transform: Transform) -> Api {
        let mut transforms = self.transforms.clone();
        transforms.push(transform);
        Api::with_transforms(self.base_url.clone(), transforms)
    }

    pub fn with_bearer_token(&self, token: impl Into<BearerToken>) -> Api {
        let token = token.into();
        self.with_transform(Transform::all(move |call| call.with_bearer_token(token.clone())))
    }

    /// New factory whose base URL is this one joined with `path`.
    pub fn with_base_url(&self, path: &str) -> Api {
        Api::with_transforms(
            build_path(&[self.base_url.as_str(), path]),
            self.transforms.clone(),
        )
    }

    pub fn with_fetch(&self, fetch: impl Fetch + 'static) -> Api {
        let fetch: Arc<dyn Fetch> = Arc::new(fetch);
        self.with_transform(Transform::all(move |call| call.with_shared_fetch(fetch.clone())))
    }

    pub fn on_response<F, Fut>(&self, callback: F) -> Api
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ApiError>> + Send + 'static,
    {
        let callback: ResponseCallback =
            Arc::new(move |response: HttpResponse| callback(response).boxed());
        self.with_transform(Transform::all(move |call| {
            call.push_response_callback(callback.clone())
        }))
    }

    pub fn on_json_response<F, Fut>(&self, callback: F) -> Api
    where
        F: Fn(Value, HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ApiError>> + Send + 'static,
    {
        let callback: JsonResponseCallback =
            Arc::new(move |data: Value, response: HttpResponse| callback(data, response).boxed());
        self.with_transform(Transform::all(move |call| call.push_json_callback(callback.clone())))
    }

    pub fn on_pre_build(&self, hook: impl Fn() + Send + Sync + 'static) -> Api {
        let hook: PreBuildHook = Arc::new(hook);
        self.with_transform(Transform::all(move |call| call.push_pre_build(hook.clone())))
    }

    /// Replace this factory's base URL in place. Calls created earlier keep
    /// their path; factories derived earlier keep their base URL.
    pub fn change_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }
}

/// Shorthand for [`Api::new`].
pub fn api(base_url: impl Into<String>) -> Api {
    Api::new(base_url)
}

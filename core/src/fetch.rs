//! The network seam.
//!
//! # Design
//! The builder never performs I/O itself. A `Fetch` receives the built
//! `HttpRequest` and returns the buffered `HttpResponse`. The one used for a
//! send is, in order: the builder's own (`with_fetch`), the process-wide one
//! installed with [`set_global_fetch`], or the built-in [`UreqFetch`] when
//! the `ureq` feature is on.

use std::future::Future;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

#[cfg(feature = "ureq")]
mod ureq_fetch;

#[cfg(feature = "ureq")]
pub use ureq_fetch::{UreqFetch, DEFAULT_BODY_LIMIT};

/// A fetch-style network primitive.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

#[async_trait]
impl<F, Fut> Fetch for F
where
    F: Fn(HttpRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HttpResponse, ApiError>> + Send + 'static,
{
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self(request).await
    }
}

static GLOBAL_FETCH: RwLock<Option<Arc<dyn Fetch>>> = RwLock::new(None);

/// Install the fetch used by builders that have none of their own.
pub fn set_global_fetch(fetch: impl Fetch + 'static) {
    *GLOBAL_FETCH
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::new(fetch));
}

/// Remove the fetch installed with [`set_global_fetch`].
pub fn clear_global_fetch() {
    *GLOBAL_FETCH
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
}

pub(crate) fn global_fetch() -> Result<Arc<dyn Fetch>, ApiError> {
    let installed = GLOBAL_FETCH
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    if let Some(fetch) = installed {
        return Ok(fetch);
    }
    default_fetch()
}

#[cfg(feature = "ureq")]
fn default_fetch() -> Result<Arc<dyn Fetch>, ApiError> {
    Ok(Arc::new(UreqFetch::default()))
}

#[cfg(not(feature = "ureq"))]
fn default_fetch() -> Result<Arc<dyn Fetch>, ApiError> {
    Err(ApiError::NoFetch)
}

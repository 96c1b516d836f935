//! Fluent request builder layered on a fetch-style network primitive.
//!
//! # Overview
//! An [`ApiCall`] accumulates method, path, query, headers, body and
//! response callbacks, and builds an [`HttpRequest`] without touching the
//! network. Awaiting it (or its [`PendingCall`] handle) hands the request to
//! a [`Fetch`] exactly once, runs the response callbacks in order, and
//! resolves to the [`HttpResponse`]. An [`Api`] factory stamps out calls
//! that share a base URL and a list of [`Transform`]s.
//!
//! ```no_run
//! use api_call::{api, Query};
//!
//! # async fn demo() -> Result<(), api_call::ApiError> {
//! let client = api("https://example.com/api").with_bearer_token("secret");
//! let user: serde_json::Value = client
//!     .get("users/1")
//!     .with_query(Query::new().with("expand", true))
//!     .expect_success_status()
//!     .json()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - Configuration is an owned value moved through each `with_*` call.
//! - Sending happens through [`PendingCall`], whose atomic guard allows one
//!   network call per handle; awaiting an `ApiCall` by value creates and
//!   drives a fresh handle.
//! - No retries, pooling, or streaming: the [`Fetch`] owns all transport
//!   concerns.

pub mod api;
pub mod auth;
pub mod call;
pub mod error;
pub mod fetch;
pub mod http;
pub mod path;
pub mod pending;
pub mod serialize;

pub use api::{api, Api, Transform};
pub use auth::BearerToken;
pub use call::{api_call, delete, get, head, options, patch, post, put, ApiCall};
pub use error::{ApiError, BoxError};
pub use fetch::{clear_global_fetch, set_global_fetch, Fetch};
#[cfg(feature = "ureq")]
pub use fetch::UreqFetch;
pub use http::{Body, FormData, Headers, HttpMethod, HttpRequest, HttpResponse, UrlEncoded};
pub use path::build_path;
pub use pending::PendingCall;
pub use serialize::{Query, QueryValue, SerializationOptions};

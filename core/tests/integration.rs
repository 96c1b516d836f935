//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port inside the test runtime, then
//! drives builders over real HTTP through the built-in `UreqFetch`. The echo
//! payload lets each test assert on exactly what went over the wire.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use api_call::{api, get, post, Api, ApiError, BearerToken, HttpMethod, Query, UreqFetch};
use mock_server::{EchoedRequest, Stats};
use serde_json::{json, Value};

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    format!("http://{addr}")
}

async fn stats(base: &str) -> Stats {
    get(format!("{base}/stats"))
        .with_fetch(UreqFetch::default())
        .json()
        .await
        .unwrap()
}

fn client(base: &str) -> Api {
    api(base).with_fetch(UreqFetch::default())
}

#[tokio::test]
async fn json_resolves_and_runs_json_callbacks_once() {
    let base = start_server().await;
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let (status_sink, body_sink) = (statuses.clone(), bodies.clone());

    let test = client(&base)
        .on_response(move |res| {
            let sink = status_sink.clone();
            async move {
                sink.lock().unwrap().push(res.status);
                Ok(())
            }
        })
        .on_json_response(move |data, _| {
            let sink = body_sink.clone();
            async move {
                sink.lock().unwrap().push(data);
                Ok(())
            }
        });

    let echoed: EchoedRequest = test.get("/fake").json().await.unwrap();
    assert_eq!(echoed.method, "GET");
    assert_eq!(echoed.path, "/fake");

    let _: Value = test.patch("/fake").json().await.unwrap();
    let _: Value = test.delete("/fake").json().await.unwrap();
    assert_eq!(test.head("/fake").await.unwrap().status, 200);
    assert_eq!(test.options("/fake").await.unwrap().status, 200);

    assert_eq!(*statuses.lock().unwrap(), vec![200; 5]);
    let bodies = bodies.lock().unwrap();
    assert_eq!(bodies.len(), 3);
    assert_eq!(bodies[0]["method"], "GET");
    assert_eq!(bodies[1]["method"], "PATCH");
    assert_eq!(bodies[2]["method"], "DELETE");
}

#[tokio::test]
async fn bytes_returns_raw_body() {
    let base = start_server().await;
    let body = client(&base).get("/blob").bytes().await.unwrap();
    let echoed: EchoedRequest = serde_json::from_slice(&body).unwrap();
    assert_eq!(echoed.path, "/blob");
}

#[tokio::test]
async fn pre_build_hook_refreshes_bearer_token() {
    let base = start_server().await;
    let auth = BearerToken::new("abc");
    let refreshed = auth.clone();

    let test = client(&base)
        .with_bearer_token(auth)
        .on_pre_build(move || refreshed.set("def"))
        .on_json_response(|data, _| async move {
            if data["headers"]["authorization"] != "Bearer def" {
                return Err(ApiError::callback(format!("unexpected headers: {}", data["headers"])));
            }
            Ok(())
        });

    for method in [HttpMethod::Get, HttpMethod::Patch, HttpMethod::Delete] {
        let _: Value = test.call("/fake", method).json().await.unwrap();
    }
}

#[tokio::test]
async fn query_headers_and_json_body_reach_the_server() {
    let base = start_server().await;
    let echoed: EchoedRequest = client(&base)
        .post("/items")
        .with_query(Query::new().with("page", 2).with("q", "a b"))
        .with_header("X-Trace", "t-1")
        .with_json_body(json!({"name": "widget", "note": ""}))
        .expect_status(200)
        .json()
        .await
        .unwrap();

    assert_eq!(echoed.method, "POST");
    assert_eq!(echoed.query.as_deref(), Some("page=2&q=a%20b"));
    assert_eq!(echoed.headers["x-trace"], "t-1");
    assert_eq!(echoed.headers["content-type"], "application/json");
    let body: Value = serde_json::from_str(&echoed.body).unwrap();
    assert_eq!(body, json!({"name": "widget", "note": ""}));
}

#[tokio::test]
async fn url_encoded_and_form_bodies_are_encoded() {
    let base = start_server().await;
    let data = Query::new().with("foo", "bar baz").with("empty", "");

    let echoed: EchoedRequest = post(format!("{base}/form"))
        .with_fetch(UreqFetch::default())
        .with_url_encoded_body(&data)
        .json()
        .await
        .unwrap();
    assert_eq!(echoed.headers["content-type"], "application/x-www-form-urlencoded");
    assert_eq!(echoed.body, "foo=bar+baz");

    let echoed: EchoedRequest = post(format!("{base}/multipart"))
        .with_fetch(UreqFetch::default())
        .with_form_data_body(&data)
        .json()
        .await
        .unwrap();
    assert!(echoed.headers["content-type"].starts_with("multipart/form-data; boundary="));
    assert!(echoed.body.contains("name=\"foo\"\r\n\r\nbar baz\r\n"));
    assert!(!echoed.body.contains("name=\"empty\""));
}

#[tokio::test]
async fn double_await_sends_one_request() {
    let base = start_server().await;
    let pending = get(base.clone()).with_fetch(UreqFetch::default()).pending();

    let echoed: EchoedRequest = pending.json().await.unwrap();
    assert_eq!(echoed.path, "/");
    assert!(matches!(pending.json::<Value>().await, Err(ApiError::AlreadyConsumed)));
    assert!(matches!((&pending).await, Err(ApiError::AlreadyConsumed)));

    let mut caught = false;
    assert!(pending.catch(|_| caught = true).await.is_none());
    assert!(caught);

    let ran = AtomicUsize::new(0);
    let _ = pending
        .finally(|| {
            ran.fetch_add(1, Ordering::SeqCst);
        })
        .await;
    assert_eq!(ran.load(Ordering::SeqCst), 1);

    assert_eq!(stats(&base).await.requests, 1);
}

#[tokio::test]
async fn expect_status_against_live_server() {
    let base = start_server().await;

    let err = get(base.clone())
        .with_fetch(UreqFetch::default())
        .expect_status(400)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::UnexpectedStatus { expected: 400, .. }));

    let res = get(base.clone())
        .with_fetch(UreqFetch::default())
        .expect_status(200)
        .await
        .unwrap();
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn expect_success_status_keeps_failed_response() {
    let base = start_server().await;
    let err = client(&base)
        .get("/status/400")
        .expect_success_status()
        .await
        .unwrap_err();

    let response = err.response().expect("status error carries response");
    assert_eq!(response.status, 400);
    let echoed: EchoedRequest = response.json().unwrap();
    assert_eq!(echoed.path, "/status/400");
}

#[tokio::test]
async fn change_base_url_redirects_later_calls() {
    let first = start_server().await;
    let second = start_server().await;
    let mut my_api = client(&first);

    let early = my_api.get("/api");
    my_api.change_base_url(format!("{second}/"));
    let late = my_api.get("/api");

    let _: Value = early.json().await.unwrap();
    let _: Value = late.json().await.unwrap();

    assert_eq!(stats(&first).await.requests, 1);
    assert_eq!(stats(&second).await.requests, 1);
}

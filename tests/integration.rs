//! End-to-end scenarios against the crate's own loopback fixture server.

mod support;

use std::time::Duration;

use reqflow::{Body, BodyEncoding, ClientState, RequestConfigBuilder, RequestError, ResponseBody};
use serde_json::json;
use support::{pattern_body, PATTERN};

fn url(addr: std::net::SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}

#[tokio::test]
async fn s1_silent_rejection_no_body() {
    let addr = support::spawn().await;
    let config = RequestConfigBuilder::new(url(addr, "/silentrejection").as_str())
        .build()
        .unwrap();
    let request = reqflow::HttpRequest::new(config);

    let err = request.perform().unwrap().await.unwrap_err();
    assert!(matches!(err, RequestError::NetworkConnectionReset { .. }));
    assert_eq!(request.state(), ClientState::Failed);
}

#[tokio::test]
async fn s2_silent_rejection_with_body() {
    let addr = support::spawn().await;
    let body = pattern_body(2_000_000);
    let config = RequestConfigBuilder::new(url(addr, "/silentrejection").as_str())
        .method(reqflow::Method::Post)
        .body(Body::Bytes(body))
        .build()
        .unwrap();
    let request = reqflow::HttpRequest::new(config);

    // Whether the OS surfaces the reset on the read side (ECONNRESET)
    // or the write side (EPIPE) first depends on exactly how much of
    // the 2 MB body made it into the socket buffer before the RST was
    // processed, so either named kind is an acceptable outcome here.
    let err = request.perform().unwrap().await.unwrap_err();
    assert!(
        matches!(err, RequestError::BrokenPipe { .. } | RequestError::NetworkConnectionReset { .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(request.state(), ClientState::Failed);
}

#[tokio::test]
async fn s3_silent_timeout_client_side() {
    let addr = support::spawn().await;
    let config = RequestConfigBuilder::new(url(addr, "/silenttimeout").as_str())
        .timeout_ms(200)
        .build()
        .unwrap();
    let request = reqflow::HttpRequest::new(config);

    let err = request.perform().unwrap().await.unwrap_err();
    assert!(matches!(err, RequestError::HttpResponseTimedOut { .. }));
    assert_eq!(request.state(), ClientState::Failed);
}

#[tokio::test]
async fn s4_check_pattern_echo() {
    let addr = support::spawn().await;
    let body = pattern_body(2_000_000);
    let config = RequestConfigBuilder::new(url(addr, "/checkpattern").as_str())
        .method(reqflow::Method::Post)
        .header("Content-Type", "application/octet-stream")
        .body(Body::Bytes(body.clone()))
        .build()
        .unwrap();
    let request = reqflow::HttpRequest::new(config);

    let response = request.perform().unwrap().await.unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.status_message, "OK");
    assert_eq!(response.headers.get("content-type"), Some("application/octet-stream"));
    assert_eq!(response.headers.get("content-length"), Some("2000000"));
    match response.body {
        Some(ResponseBody::Bytes(bytes)) => assert_eq!(bytes, body),
        other => panic!("expected raw bytes, got {other:?}"),
    }
    assert_eq!(request.state(), ClientState::Fulfilled);
}

#[tokio::test]
async fn s5_cancellation_during_silent_wait() {
    let addr = support::spawn().await;
    let config = RequestConfigBuilder::new(url(addr, "/silenttimeout").as_str())
        .build()
        .unwrap();
    let request = reqflow::HttpRequest::new(config);

    // `perform()` spawns the driver task synchronously; the returned
    // future only observes its settlement, so it's fine to defer
    // awaiting it until after cancelling.
    let perform_fut = request.perform().unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let ack = request.cancel().unwrap().await;
    assert!(ack);

    let err = perform_fut.await.unwrap_err();
    assert!(matches!(err, RequestError::HttpRequestCancelled { .. }));
    assert_eq!(request.state(), ClientState::Cancelled);
}

#[tokio::test]
async fn s6_empty_response() {
    let addr = support::spawn().await;
    let config = RequestConfigBuilder::new(url(addr, "/silentresponse").as_str())
        .build()
        .unwrap();
    let request = reqflow::HttpRequest::new(config);

    let response = request.perform().unwrap().await.unwrap();
    assert_eq!(response.status_code, 204);
    assert_eq!(response.status_message, "No Content");
    assert!(response.body.is_none());
    assert_eq!(request.state(), ClientState::Fulfilled);
}

#[tokio::test]
async fn s7_non_serializable_body() {
    let addr = support::spawn().await;
    let nan = serde_json::Value::from(f64::NAN);
    let config = RequestConfigBuilder::new(url(addr, "/checkpattern").as_str())
        .method(reqflow::Method::Post)
        .header("Content-Type", "application/json")
        .body(Body::Structured(json!({ "bad": nan })))
        .build()
        .unwrap();
    let request = reqflow::HttpRequest::new(config);

    let err = request.perform().unwrap().await.unwrap_err();
    assert!(matches!(err, RequestError::HttpRequestBodyObjectNotSerializable { .. }));
    assert_eq!(request.state(), ClientState::Failed);
}

#[tokio::test]
async fn idempotent_perform_returns_same_settlement() {
    let addr = support::spawn().await;
    let config = RequestConfigBuilder::new(url(addr, "/silentresponse").as_str())
        .build()
        .unwrap();
    let request = reqflow::HttpRequest::new(config);

    let (a, b) = tokio::join!(request.perform().unwrap(), request.perform().unwrap());
    assert_eq!(a.unwrap().status_code, b.unwrap().status_code);
}

#[tokio::test]
async fn json_auto_decoding() {
    let addr = support::spawn().await;
    let payload = serde_json::to_vec(&json!({"ok": true})).unwrap();
    let config = RequestConfigBuilder::new(url(addr, "/checkpattern").as_str())
        .method(reqflow::Method::Post)
        .body(Body::Structured(json!({"ok": true})))
        .body_encoding(BodyEncoding::Utf8)
        .build()
        .unwrap();
    let request = reqflow::HttpRequest::new(config);

    let response = request.perform().unwrap().await.unwrap();
    match response.body {
        Some(ResponseBody::Bytes(bytes)) => assert_eq!(bytes, payload),
        other => panic!("server doesn't set a json content-type, expected raw bytes: {other:?}"),
    }
}

#[test]
fn pattern_is_stable() {
    let body = pattern_body(100);
    assert_eq!(body.len(), 100);
    assert!(body.starts_with(PATTERN.as_bytes()));
}

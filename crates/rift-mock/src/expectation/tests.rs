//! Tests for the expectation module.
//!
//! Covers the builder methods and serving a matched request: wait
//! policies, handler failures and response header merging.

use super::*;
use crate::error::ConfigError;
use crate::matcher::{is_not_empty, Matcher};
use crate::planner::Expectation;
use crate::request::Request;
use crate::response::ResponseWriter;
use hyper::{Method, StatusCode};
use regex::Regex;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

async fn serve(expectation: &RequestExpectation) -> (ResponseWriter, Result<(), HandleError>) {
    serve_with_defaults(expectation, &BTreeMap::new()).await
}

async fn serve_with_defaults(
    expectation: &RequestExpectation,
    defaults: &BTreeMap<String, String>,
) -> (ResponseWriter, Result<(), HandleError>) {
    let mut writer = ResponseWriter::new();
    let mut request = Request::builder().build();
    let result = expectation.handle(&mut writer, &mut request, defaults).await;
    (writer, result)
}

#[test]
fn test_new_defaults() {
    let expectation = RequestExpectation::new(Method::GET, "/");

    assert_eq!(expectation.method(), Method::GET);
    assert_eq!(expectation.uri_matcher().expected(), "/");
    assert!(expectation.header_matcher().is_empty());
    assert!(expectation.body_matcher().is_none());
    assert_eq!(expectation.remain_times(), Repeat::Unlimited);
    assert_eq!(expectation.fulfilled_times(), 0);
    assert_eq!(expectation.status(), StatusCode::OK);
}

#[test]
fn test_uri_regex() {
    let expectation = RequestExpectation::new(Method::GET, Regex::new("^/users/[0-9]+$").unwrap());

    assert!(expectation.uri_matcher().matches("/users/42").unwrap());
    assert_eq!(expectation.uri_matcher().kind(), Some("RegexMatcher"));
}

#[test]
fn test_with_header_and_headers() {
    let expectation = RequestExpectation::new(Method::GET, "/");
    expectation
        .with_header("Authorization", "Bearer token")
        .with_headers([("X-Id", "1"), ("X-Trace", "abc")])
        .with_header("X-Request-Id", is_not_empty());

    let names: Vec<String> = expectation
        .header_matcher()
        .iter()
        .map(|(name, _)| name.to_string())
        .collect();

    assert_eq!(names, ["Authorization", "X-Id", "X-Request-Id", "X-Trace"]);
}

#[test]
fn test_with_header_unsupported_value() {
    let expectation = RequestExpectation::new(Method::GET, "/");
    let err = expectation
        .try_with_header("X-Id", serde_json::json!(1))
        .unwrap_err();

    assert!(matches!(err, ConfigError::UnsupportedDataType("number")));
}

#[test]
#[should_panic(expected = "unsupported data type: bool")]
fn test_with_body_unsupported_panics() {
    RequestExpectation::new(Method::POST, "/").with_body(serde_json::json!(true));
}

#[test]
fn test_with_body_json() {
    let expectation = RequestExpectation::new(Method::POST, "/");
    expectation.with_body_json(&serde_json::json!({"foo": "bar"}));

    let body = expectation.body_matcher().unwrap();
    assert_eq!(body.expected(), r#"{"foo":"bar"}"#);
    assert_eq!(body.matcher().kind(), Some("JsonMatcher"));

    let mut request = Request::builder().body(r#"{ "foo" : "bar" }"#).build();
    assert!(body.matches(&mut request).unwrap());
}

#[test]
fn test_with_body_json_str_ignore_diff() {
    let expectation = RequestExpectation::new(Method::POST, "/");
    expectation.with_body_json_str(r#"{"id":"<ignore-diff>","name":"x"}"#);

    let body = expectation.body_matcher().unwrap();
    let mut request = Request::builder().body(r#"{"id":7,"name":"x"}"#).build();

    assert!(body.matches(&mut request).unwrap());
}

#[test]
fn test_return_code_invalid() {
    let expectation = RequestExpectation::new(Method::GET, "/");
    let err = expectation.try_return_code(42).unwrap_err();

    assert_eq!(err.to_string(), "invalid status code: 42");
}

#[test]
fn test_repeat_setters() {
    let expectation = RequestExpectation::new(Method::GET, "/");

    expectation.once();
    assert_eq!(expectation.remain_times(), Repeat::Times(1));

    expectation.twice();
    assert_eq!(expectation.remain_times(), Repeat::Times(2));

    expectation.times(5);
    assert_eq!(expectation.remain_times(), Repeat::Times(5));

    expectation.unlimited_times();
    assert_eq!(expectation.remain_times(), Repeat::Unlimited);
}

#[test]
fn test_fulfilled_counts_down() {
    let expectation = RequestExpectation::new(Method::GET, "/");
    expectation.twice();

    expectation.fulfilled();
    assert_eq!(expectation.remain_times(), Repeat::Times(1));
    assert_eq!(expectation.fulfilled_times(), 1);

    expectation.fulfilled();
    assert!(expectation.remain_times().is_exhausted());
    assert_eq!(expectation.fulfilled_times(), 2);
}

#[test]
fn test_fulfilled_unlimited_stays_unlimited() {
    let expectation = RequestExpectation::new(Method::GET, "/");

    for _ in 0..3 {
        expectation.fulfilled();
    }

    assert_eq!(expectation.remain_times(), Repeat::Unlimited);
    assert_eq!(expectation.fulfilled_times(), 3);
}

#[test]
fn test_wait_last_setter_wins() {
    let expectation = RequestExpectation::new(Method::GET, "/");
    let (_tx, rx) = mpsc::channel(1);

    expectation.wait_until(rx).after(Duration::from_millis(10));
    assert!(matches!(expectation.waiter(), Waiter::Duration(_)));

    let (_tx, rx) = mpsc::channel(1);
    expectation.wait_until(rx);
    assert!(matches!(expectation.waiter(), Waiter::Signal(_)));
}

#[tokio::test]
async fn test_handle_default_response() {
    let expectation = RequestExpectation::new(Method::GET, "/");

    let (writer, result) = serve(&expectation).await;

    assert!(result.is_ok());
    assert_eq!(writer.status(), StatusCode::OK);
    assert!(writer.body().is_empty());
}

#[tokio::test]
async fn test_handle_return_body_code_and_headers() {
    let expectation = RequestExpectation::new(Method::POST, "/create");
    expectation
        .return_code(201)
        .return_header("X-ID", "1")
        .return_body(r#"{"id":1,"foo":"bar"}"#);

    let (writer, result) = serve(&expectation).await;

    assert!(result.is_ok());
    assert_eq!(writer.status(), StatusCode::CREATED);
    assert_eq!(writer.headers().get("x-id").unwrap(), "1");
    assert_eq!(writer.body(), br#"{"id":1,"foo":"bar"}"#);
}

#[tokio::test]
async fn test_handle_merges_default_headers() {
    let expectation = RequestExpectation::new(Method::GET, "/");
    expectation.return_headers([("content-type", "application/json")]);

    let defaults = BTreeMap::from([
        ("Content-Type".to_string(), "text/plain".to_string()),
        ("X-Server".to_string(), "rift".to_string()),
    ]);

    let (writer, _) = serve_with_defaults(&expectation, &defaults).await;

    assert_eq!(
        writer.headers().get("content-type").unwrap(),
        "application/json"
    );
    assert_eq!(writer.headers().get("x-server").unwrap(), "rift");
}

#[tokio::test]
async fn test_handle_return_json() {
    let expectation = RequestExpectation::new(Method::GET, "/");
    expectation.return_json(serde_json::json!({"id": 42}));

    let (writer, _) = serve(&expectation).await;

    assert_eq!(writer.body(), br#"{"id":42}"#);
}

#[tokio::test]
async fn test_handle_return_file_reads_every_time() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "hello world").unwrap();

    let expectation = RequestExpectation::new(Method::GET, "/");
    expectation.return_file(file.path());

    let (writer, _) = serve(&expectation).await;
    assert_eq!(writer.body(), b"hello world");

    std::fs::write(file.path(), "changed").unwrap();

    let (writer, _) = serve(&expectation).await;
    assert_eq!(writer.body(), b"changed");
}

#[test]
fn test_return_file_missing() {
    let expectation = RequestExpectation::new(Method::GET, "/");
    let err = expectation
        .try_return_file("does/not/exist.txt")
        .unwrap_err();

    assert!(matches!(err, ConfigError::FileNotFound { .. }));
}

#[tokio::test]
async fn test_handle_run_reads_request() {
    let expectation = RequestExpectation::new(Method::POST, "/echo");
    expectation.run(|request| Ok(request.body_bytes()?.to_vec()));

    let mut writer = ResponseWriter::new();
    let mut request = Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .body("ping")
        .build();

    expectation
        .handle(&mut writer, &mut request, &BTreeMap::new())
        .await
        .unwrap();

    assert_eq!(writer.body(), b"ping");
}

#[tokio::test]
async fn test_handle_error_writes_internal_server_error() {
    let expectation = RequestExpectation::new(Method::GET, "/");
    expectation
        .return_code(201)
        .run(|_| Err(anyhow::anyhow!("handler error")));

    let (writer, result) = serve(&expectation).await;

    let err = result.unwrap_err();
    assert!(matches!(err, HandleError::Handler(_)));
    assert_eq!(err.to_string(), "handler error");
    assert_eq!(writer.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(writer.body(), b"handler error");
}

#[tokio::test]
async fn test_handle_invalid_response_header() {
    let expectation = RequestExpectation::new(Method::GET, "/");
    expectation
        .return_header("X-Bad", "line\nbreak")
        .return_body("ok");

    let (writer, result) = serve(&expectation).await;

    let err = result.unwrap_err();
    assert!(matches!(err, HandleError::Response(_)));
    assert_eq!(writer.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(writer.body(), err.to_string().as_bytes());
}

#[tokio::test]
async fn test_handle_contains_handler_panic() {
    let expectation = RequestExpectation::new(Method::GET, "/");
    expectation.run(|_| panic!("handler blew up"));

    let (writer, result) = serve(&expectation).await;

    let err = result.unwrap_err();
    assert!(matches!(err, HandleError::Handler(_)));
    assert_eq!(err.to_string(), "response handler panicked: handler blew up");
    assert_eq!(writer.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(writer.body(), b"response handler panicked: handler blew up");
}

#[tokio::test]
async fn test_handle_after_delays_response() {
    let expectation = RequestExpectation::new(Method::GET, "/");
    expectation.after(Duration::from_millis(100));

    let start = Instant::now();
    serve(&expectation).await;

    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_handle_wait_until_signal() {
    let expectation = Arc::new(RequestExpectation::new(Method::GET, "/"));
    let (tx, rx) = mpsc::channel(1);
    expectation.wait_until(rx).return_body("released");

    let task = {
        let expectation = expectation.clone();
        tokio::spawn(async move {
            let (writer, _) = serve(&expectation).await;
            writer.body().to_vec()
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!task.is_finished());

    tx.send(()).await.unwrap();

    assert_eq!(task.await.unwrap(), b"released");
}

#[tokio::test]
async fn test_concurrent_handles_are_serialized() {
    let expectation = Arc::new(RequestExpectation::new(Method::GET, "/"));
    expectation.after(Duration::from_millis(50));

    let start = Instant::now();
    let first = {
        let expectation = expectation.clone();
        tokio::spawn(async move { serve(&expectation).await.1.is_ok() })
    };
    let second = {
        let expectation = expectation.clone();
        tokio::spawn(async move { serve(&expectation).await.1.is_ok() })
    };

    assert!(first.await.unwrap());
    assert!(second.await.unwrap());
    assert!(start.elapsed() >= Duration::from_millis(100));
}

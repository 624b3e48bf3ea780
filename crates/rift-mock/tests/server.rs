//! Integration tests for the mock server over real HTTP.
//!
//! Each test starts its own server on a free loopback port and talks to it
//! with reqwest.

use reqwest::{Client, StatusCode};
use rift_mock::{
    assert_header_contains, JsonMatcher, MockServer, ServerConfig, TestRecorder, TestingT,
};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[tokio::test]
async fn test_get_returns_body() {
    let server = MockServer::start().await;
    server.expect_get("/hi").return_body("hello world");

    let response = Client::new()
        .get(format!("{}/hi", server.url()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "hello world");
    assert!(server.expectations_were_met().is_ok());
}

#[tokio::test]
async fn test_post_with_header_and_body() {
    let server = MockServer::start().await;
    server
        .expect_post("/create")
        .with_header("Authorization", "Bearer token")
        .with_body(r#"{"foo":"bar"}"#)
        .return_code(201)
        .return_header("X-ID", "1")
        .return_body(r#"{"id":1,"foo":"bar"}"#);

    let response = Client::new()
        .post(format!("{}/create", server.url()))
        .header("Authorization", "Bearer token")
        .body(r#"{"foo":"bar"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_header_contains(response.headers(), [("X-ID", "1")]);
    assert_eq!(response.text().await.unwrap(), r#"{"id":1,"foo":"bar"}"#);
    assert!(server.expectations_were_met().is_ok());
}

#[tokio::test]
async fn test_unmet_expectation_is_listed() {
    let server = MockServer::start().await;
    server.expect_get("/");

    let err = server.expectations_were_met().unwrap_err();

    assert_eq!(
        err.to_string(),
        "there are remaining expectations that were not met:\n- GET /\n"
    );
}

#[tokio::test]
async fn test_after_delays_response() {
    let server = MockServer::start().await;
    server.expect_get("/path").after(Duration::from_millis(100));

    let start = Instant::now();
    let response = Client::new()
        .get(format!("{}/path", server.url()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_method_mismatch_returns_diagnostic() {
    let server = MockServer::start().await;
    server.expect_get("/");

    let response = Client::new().post(server.url()).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text().await.unwrap();
    // The client adds its own headers to the actual request.
    assert!(body.starts_with("Expected: GET /\nActual: POST /\n"), "{body}");
    assert!(
        body.ends_with("Error: method \"GET\" expected, \"POST\" received\n"),
        "{body}"
    );

    // The head is not consumed by a mismatch.
    assert!(server.expectations_were_met().is_err());
    assert_eq!(server.failures().len(), 1);
}

#[tokio::test]
async fn test_requests_beyond_expectations_are_unexpected() {
    let server = MockServer::start().await;
    server.expect_get("/one");
    server.expect_get("/two");
    let client = Client::new();

    for path in ["/one", "/two"] {
        let response = client
            .get(format!("{}{path}", server.url()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }

    let response = client
        .post(format!("{}/three", server.url()))
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.text().await.unwrap(),
        "unexpected request received: POST /three, body:\npayload"
    );
}

#[tokio::test]
async fn test_times_and_unlimited() {
    let server = MockServer::start().await;
    server.expect_get("/limited").times(2);
    server.expect_get("/forever").unlimited_times();
    let client = Client::new();

    for _ in 0..2 {
        let response = client
            .get(format!("{}/limited", server.url()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    for _ in 0..5 {
        let response = client
            .get(format!("{}/forever", server.url()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert!(server.expectations_were_met().is_ok());
}

#[tokio::test]
async fn test_query_string_is_part_of_uri() {
    let server = MockServer::start().await;
    server.expect_get(regex::Regex::new(r"^/search\?q=\w+$").unwrap());

    let response = Client::new()
        .get(format!("{}/search?q=rust", server.url()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(server.received_requests()[0].uri, "/search?q=rust");
}

#[tokio::test]
async fn test_json_body_with_ignored_field() {
    let server = MockServer::start().await;
    server
        .expect_post("/users")
        .with_body(JsonMatcher::new(r#"{"id":"<ignore-diff>","name":"x"}"#))
        .return_json(json!({"created": true}));

    let response = Client::new()
        .post(format!("{}/users", server.url()))
        .json(&json!({"name": "x", "id": 7}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!({"created": true}));
}

#[tokio::test]
async fn test_default_response_headers_from_config() {
    let config =
        ServerConfig::default().with_default_response_header("content-type", "application/json");
    let server = MockServer::start_with(config).await;
    server.expect_get("/").return_body("{}");
    server
        .expect_get("/text")
        .return_header("Content-Type", "text/plain");
    let client = Client::new();

    let response = client.get(server.url()).send().await.unwrap();
    assert_header_contains(response.headers(), [("Content-Type", "application/json")]);

    let response = client
        .get(format!("{}/text", server.url()))
        .send()
        .await
        .unwrap();
    assert_header_contains(response.headers(), [("Content-Type", "text/plain")]);
}

#[tokio::test]
async fn test_wait_until_blocks_until_signal() {
    let server = MockServer::start().await;
    let (tx, rx) = mpsc::channel(1);
    server.expect_get("/slow").wait_until(rx).return_body("done");

    let url = format!("{}/slow", server.url());
    let request = tokio::spawn(async move { Client::new().get(url).send().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!request.is_finished());

    tx.send(()).await.unwrap();
    let response = request.await.unwrap().unwrap();

    assert_eq!(response.text().await.unwrap(), "done");
}

#[tokio::test]
async fn test_return_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "from file").unwrap();

    let server = MockServer::start().await;
    server.expect_get("/file").return_file(file.path());

    let response = Client::new()
        .get(format!("{}/file", server.url()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.text().await.unwrap(), "from file");
}

#[tokio::test]
async fn test_run_echoes_request_body() {
    let server = MockServer::start().await;
    server.expect_put("/echo").run(|request| {
        let body = request.body_bytes()?;
        Ok(body.to_vec())
    });

    let response = Client::new()
        .put(format!("{}/echo", server.url()))
        .body("ping")
        .send()
        .await
        .unwrap();

    assert_eq!(response.text().await.unwrap(), "ping");
}

#[tokio::test]
async fn test_failures_reported_to_test() {
    let recorder = Arc::new(TestRecorder::new());
    let server = MockServer::start().await;
    server.with_test(recorder.clone() as Arc<dyn TestingT>);

    Client::new()
        .delete(format!("{}/users/1", server.url()))
        .send()
        .await
        .unwrap();

    assert_eq!(
        recorder.errors(),
        ["unexpected request received: DELETE /users/1"]
    );
}

#[tokio::test]
#[should_panic(expected = "could not change planner: planner is not empty")]
async fn test_with_planner_after_expect_panics() {
    let server = MockServer::start().await;
    server.expect_get("/");
    server.with_planner(rift_mock::sequence());
}

#[tokio::test]
async fn test_closed_server_refuses_connections() {
    let server = MockServer::start().await;
    let url = server.url();
    server.close();

    tokio::time::sleep(Duration::from_millis(50)).await;
    let result = Client::new()
        .get(url)
        .timeout(Duration::from_secs(1))
        .send()
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_close_drops_keep_alive_connections() {
    let server = MockServer::start().await;
    server.expect_get("/a").return_body("a");
    server.expect_get("/b").return_body("b");
    let client = Client::new();

    let response = client
        .get(format!("{}/a", server.url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "a");

    server.close();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let result = client
        .get(format!("{}/b", server.url()))
        .timeout(Duration::from_secs(1))
        .send()
        .await;

    assert!(result.is_err());
    assert_eq!(server.received_requests().len(), 1);
}

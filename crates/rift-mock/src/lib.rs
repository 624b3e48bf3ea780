//! Programmable HTTP mock server for tests.
//!
//! Register expectations on a [`MockServer`], point the code under test at
//! [`MockServer::url`], then check [`MockServer::expectations_were_met`].
//!
//! ```no_run
//! # async fn example() {
//! use rift_mock::{JsonMatcher, MockServer};
//!
//! let server = MockServer::start().await;
//!
//! server
//!     .expect_post("/users")
//!     .with_header("Authorization", "Bearer token")
//!     .with_body(JsonMatcher::new(r#"{"name":"<ignore-diff>"}"#))
//!     .return_code(201)
//!     .return_header("X-ID", "1")
//!     .return_json(serde_json::json!({"id": 1}));
//!
//! // ... exercise the client ...
//!
//! server.expectations_were_met().unwrap();
//! # }
//! ```
//!
//! Requests are matched strictly in declaration order. A request that does not
//! match the next expectation gets a `500` response whose body explains the
//! difference, and the same text is reported to the attached [`TestingT`].

pub mod config;
pub mod error;
pub mod expectation;
pub mod format;
pub mod matcher;
pub mod mock;
pub mod planner;
pub mod request;
pub mod response;
pub mod server;
pub mod testing;

pub use config::ServerConfig;
pub use error::{ConfigError, MatcherError};
pub use expectation::{Repeat, RequestExpectation};
pub use matcher::{
    callback, exact, fn_matcher, is_not_empty, regex, regex_pattern, JsonMatcher, Matcher, Value,
    IGNORE_DIFF,
};
pub use mock::{mock_server, new_mocker, Mocker};
pub use planner::{sequence, Expectation, Planner};
pub use request::Request;
pub use server::{MockServer, RecordedRequest, UnmetExpectations};
pub use testing::{assert_header_contains, TestRecorder, TestingT};

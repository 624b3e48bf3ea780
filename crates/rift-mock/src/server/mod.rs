//! The mock HTTP server.
//!
//! A [`MockServer`] listens on a loopback port and answers each request with
//! the next planned expectation:
//!
//! ```no_run
//! # async fn example() {
//! use rift_mock::MockServer;
//!
//! let server = MockServer::start().await;
//! server.expect_get("/hi").return_body("hello");
//!
//! // ... exercise the client against server.url() ...
//!
//! server.expectations_were_met().unwrap();
//! # }
//! ```

mod core;
mod handler;
mod types;


pub use core::{ExpectationOption, MockServer};
pub use types::{RecordedRequest, ServerError, UnmetExpectations};

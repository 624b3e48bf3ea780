//! Request expectations.
//!
//! A [`RequestExpectation`] describes one expected request (method, URI,
//! headers, body) and the response it gets (status, headers, body handler),
//! together with how often it may be used and how long to wait before
//! answering.
//!
//! ## Module Structure
//!
//! - `types`: repeat and wait policies, handler and error types
//! - `core`: the expectation and its builder methods
//! - `response`: response header merging

mod core;
mod response;
mod types;

#[cfg(test)]
mod tests;

pub use core::RequestExpectation;
pub use response::merge_headers;
pub use types::{ExpectationHandler, HandleError, Repeat, ResponseHandler, Waiter};

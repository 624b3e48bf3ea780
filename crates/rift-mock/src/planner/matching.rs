//! Field-by-field comparison of a request against one expectation.
//!
//! Checks run in a fixed order (method, URI, header, body) and stop at the
//! first failure. Matchers are user code: a panic inside one is caught and
//! reported as a regular mismatch.

use super::{Expectation, MatchError};
use crate::request::Request;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

pub fn match_request(expected: &dyn Expectation, actual: &mut Request) -> Result<(), MatchError> {
    match_method(expected, actual)?;
    match_uri(expected, actual)?;
    match_header(expected, actual)?;
    match_body(expected, actual)
}

pub fn match_method(expected: &dyn Expectation, actual: &mut Request) -> Result<(), MatchError> {
    let method = expected.method();

    if method != *actual.method() {
        let message = format!(
            "method {:?} expected, {:?} received",
            method.as_str(),
            actual.method().as_str()
        );
        return Err(MatchError::new(expected, actual, message));
    }

    Ok(())
}

pub fn match_uri(expected: &dyn Expectation, actual: &mut Request) -> Result<(), MatchError> {
    let uri = expected.uri_matcher();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| uri.matches(actual.uri())));

    let message = match outcome {
        Ok(Ok(true)) => return Ok(()),
        Ok(Ok(false)) => format!(
            "request uri {:?} expected, {:?} received",
            uri.expected(),
            actual.uri()
        ),
        Ok(Err(err)) => format!("could not match request uri: {err}"),
        Err(payload) => format!("could not match request uri: {}", recovered(payload)),
    };

    Err(MatchError::new(expected, actual, message))
}

pub fn match_header(expected: &dyn Expectation, actual: &mut Request) -> Result<(), MatchError> {
    let header = expected.header_matcher();
    if header.is_empty() {
        return Ok(());
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| header.matches(actual.headers())));

    let message = match outcome {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(err)) => err.to_string(),
        Err(payload) => format!("could not match header: {}", recovered(payload)),
    };

    Err(MatchError::new(expected, actual, message))
}

pub fn match_body(expected: &dyn Expectation, actual: &mut Request) -> Result<(), MatchError> {
    let Some(body) = expected.body_matcher() else {
        return Ok(());
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body.matches(actual)));

    let message = match outcome {
        Ok(Ok(true)) => return Ok(()),
        Ok(Ok(false)) => {
            let expected_body = body.expected();
            if expected_body.is_empty() {
                format!(
                    "body does not match expectation, received: {}",
                    body.actual()
                )
            } else {
                format!(
                    "expected request body: {expected_body}, received: {}",
                    body.actual()
                )
            }
        }
        Ok(Err(err)) => format!("could not match body: {err}"),
        Err(payload) => format!("could not match body: {}", recovered(payload)),
    };

    Err(MatchError::new(expected, actual, message))
}

/// Message carried by a caught panic.
pub(crate) fn recovered(payload: Box<dyn Any + Send>) -> String {
    let message = match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "unknown panic".to_string(),
        },
    };

    debug!(%message, "recovered panic");
    message
}

//! Request body matching.

use super::Matcher;
use crate::error::MatcherError;
use crate::request::Request;
use parking_lot::Mutex;
use std::sync::Arc;

/// Placeholder reported as the actual body when the body could not be read.
pub const UNDECODED_BODY: &str = "<could not decode>";

/// Applies a value matcher to the full request body.
///
/// Reading the body does not consume it; handlers see the same payload. The
/// last evaluated body is kept for mismatch reports.
#[derive(Debug)]
pub struct BodyMatcher {
    matcher: Arc<dyn Matcher>,
    actual: Mutex<String>,
}

impl BodyMatcher {
    pub fn new(matcher: Arc<dyn Matcher>) -> Self {
        Self {
            matcher,
            actual: Mutex::new(String::new()),
        }
    }

    /// Read the body and evaluate it.
    pub fn matches(&self, request: &mut Request) -> Result<bool, MatcherError> {
        *self.actual.lock() = UNDECODED_BODY.to_string();

        let body = request.body_bytes()?;
        let body = String::from_utf8_lossy(&body).into_owned();

        let result = self.matcher.matches(&body);
        *self.actual.lock() = body;

        result
    }

    /// Body seen by the last evaluation.
    pub fn actual(&self) -> String {
        self.actual.lock().clone()
    }

    pub fn expected(&self) -> String {
        self.matcher.expected()
    }

    pub fn matcher(&self) -> &Arc<dyn Matcher> {
        &self.matcher
    }
}

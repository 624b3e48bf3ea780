use super::Expectation;
use crate::format;
use crate::request::{Request, RequestSnapshot};
use std::fmt;
use thiserror::Error;

/// A request that does not satisfy an expectation.
///
/// Holds both sides of the comparison. `Display` renders the full report:
///
/// ```text
/// Expected: GET /
/// Actual: POST /
/// Error: method "GET" expected, "POST" received
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchError {
    expected: String,
    actual: RequestSnapshot,
    message: String,
}

impl MatchError {
    pub fn new(
        expected: &dyn Expectation,
        actual: &mut Request,
        message: impl Into<String>,
    ) -> Self {
        let mut rendered = String::new();
        // Writing into a String cannot fail.
        let _ = format::expected_request(
            &mut rendered,
            expected.method().as_str(),
            expected.uri_matcher().as_ref(),
            &expected.header_matcher(),
            expected.body_matcher().as_deref(),
            0,
            0,
        );

        Self {
            expected: rendered,
            actual: actual.snapshot(),
            message: message.into(),
        }
    }

    /// Short reason, the `Error:` line of the report.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn actual(&self) -> &RequestSnapshot {
        &self.actual
    }
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expected: {}", self.expected)?;
        f.write_str("Actual: ")?;
        format::actual_request(f, &self.actual)?;
        writeln!(f, "Error: {}", self.message)
    }
}

impl std::error::Error for MatchError {}

/// Why a planner could not pick an expectation for a request.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("{0}")]
    Mismatch(#[from] MatchError),
    #[error("no expectation left to plan")]
    Exhausted,
    /// Raised by custom planners with their own diagnostic.
    #[error("{0}")]
    Rejected(String),
}

//! Structural JSON comparison.

use super::Matcher;
use crate::error::MatcherError;
use serde_json::Value as Json;

/// Placeholder accepted in an expected document for values that may differ.
pub const IGNORE_DIFF: &str = "<ignore-diff>";

/// Compares two JSON documents structurally, ignoring formatting and key order.
///
/// A string value of `<ignore-diff>` in the expected document accepts any
/// value at that position, at any depth. The key must still be present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonMatcher {
    expected: String,
}

impl JsonMatcher {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl Matcher for JsonMatcher {
    fn matches(&self, actual: &str) -> Result<bool, MatcherError> {
        let expected: Json = serde_json::from_str(&self.expected)
            .map_err(|e| MatcherError::InvalidExpectedJson(e.to_string()))?;

        // A body that is not JSON simply does not match.
        let Ok(actual) = serde_json::from_str::<Json>(actual) else {
            return Ok(false);
        };

        Ok(json_equals(&actual, &expected))
    }

    fn expected(&self) -> String {
        self.expected.clone()
    }

    fn kind(&self) -> Option<&'static str> {
        Some("JsonMatcher")
    }
}

fn json_equals(actual: &Json, expected: &Json) -> bool {
    match (actual, expected) {
        (_, Json::String(marker)) if marker == IGNORE_DIFF => true,
        (Json::Null, Json::Null) => true,
        (Json::Bool(a), Json::Bool(b)) => a == b,
        (Json::Number(a), Json::Number(b)) => a == b || a.as_f64() == b.as_f64(),
        (Json::String(a), Json::String(b)) => a == b,
        (Json::Array(a), Json::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| json_equals(x, y))
        }
        (Json::Object(a), Json::Object(b)) => {
            a.len() == b.len()
                && b.iter().all(|(key, expected_val)| {
                    a.get(key)
                        .is_some_and(|actual_val| json_equals(actual_val, expected_val))
                })
        }
        _ => false,
    }
}

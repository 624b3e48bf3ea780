//! Request header matching.

use super::Matcher;
use crate::error::MatcherError;
use hyper::HeaderMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Header name to value matcher mapping. An empty mapping matches anything.
#[derive(Debug, Clone, Default)]
pub struct HeaderMatcher {
    matchers: BTreeMap<String, Arc<dyn Matcher>>,
}

#[derive(Debug, Error)]
pub enum HeaderMatchError {
    #[error("could not match header: {0}")]
    Matcher(#[source] MatcherError),
    #[error("header {name:?} with value {expected:?} expected, {actual:?} received")]
    Mismatch {
        name: String,
        expected: String,
        actual: String,
    },
}

impl HeaderMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, matcher: Arc<dyn Matcher>) {
        self.matchers.insert(name.into(), matcher);
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// Configured headers in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Matcher>)> {
        self.matchers.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check every configured header. A missing header is compared as an empty string.
    pub fn matches(&self, headers: &HeaderMap) -> Result<(), HeaderMatchError> {
        for (name, matcher) in &self.matchers {
            let actual = headers
                .get(name.as_str())
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .unwrap_or_default();

            if !matcher.matches(&actual).map_err(HeaderMatchError::Matcher)? {
                return Err(HeaderMatchError::Mismatch {
                    name: name.clone(),
                    expected: matcher.expected(),
                    actual,
                });
            }
        }

        Ok(())
    }
}

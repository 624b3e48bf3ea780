//! String matchers: exact, regex, not-empty, predicate and lazy callback.

use super::Matcher;
use crate::error::{ConfigError, MatcherError};
use regex::Regex;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Matches by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactMatcher {
    expected: String,
}

impl Matcher for ExactMatcher {
    fn matches(&self, actual: &str) -> Result<bool, MatcherError> {
        Ok(self.expected == actual)
    }

    fn expected(&self) -> String {
        self.expected.clone()
    }

    fn kind(&self) -> Option<&'static str> {
        None
    }
}

/// Matches with a compiled regular expression.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
}

impl Matcher for RegexMatcher {
    fn matches(&self, actual: &str) -> Result<bool, MatcherError> {
        Ok(self.regex.is_match(actual))
    }

    fn expected(&self) -> String {
        self.regex.as_str().to_string()
    }

    fn kind(&self) -> Option<&'static str> {
        Some("RegexMatcher")
    }
}

/// Matches any non-empty value.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsNotEmptyMatcher;

impl Matcher for IsNotEmptyMatcher {
    fn matches(&self, actual: &str) -> Result<bool, MatcherError> {
        Ok(!actual.is_empty())
    }

    fn expected(&self) -> String {
        "is not empty".to_string()
    }

    fn kind(&self) -> Option<&'static str> {
        Some("IsNotEmptyMatcher")
    }
}

type Predicate = dyn Fn(&str) -> Result<bool, MatcherError> + Send + Sync;

/// Matches with a user supplied predicate.
#[derive(Clone)]
pub struct FnMatcher {
    expected: String,
    predicate: Arc<Predicate>,
}

impl fmt::Debug for FnMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMatcher")
            .field("expected", &self.expected)
            .finish_non_exhaustive()
    }
}

impl Matcher for FnMatcher {
    fn matches(&self, actual: &str) -> Result<bool, MatcherError> {
        (self.predicate)(actual)
    }

    fn expected(&self) -> String {
        self.expected.clone()
    }

    fn describe(&self) -> String {
        if self.expected.is_empty() {
            "matches custom expectation".to_string()
        } else {
            self.expected.clone()
        }
    }

    fn kind(&self) -> Option<&'static str> {
        None
    }
}

type Factory = dyn Fn() -> Arc<dyn Matcher> + Send + Sync;

/// Defers building the real matcher until it is first used.
#[derive(Clone)]
pub struct Callback {
    factory: Arc<Factory>,
    upstream: Arc<OnceLock<Arc<dyn Matcher>>>,
}

impl Callback {
    pub fn new(factory: Arc<Factory>) -> Self {
        Self {
            factory,
            upstream: Arc::new(OnceLock::new()),
        }
    }

    /// The matcher produced by the factory, built on first access.
    pub fn matcher(&self) -> &Arc<dyn Matcher> {
        self.upstream.get_or_init(|| (self.factory)())
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("upstream", &self.upstream.get())
            .finish_non_exhaustive()
    }
}

impl Matcher for Callback {
    fn matches(&self, actual: &str) -> Result<bool, MatcherError> {
        self.matcher().matches(actual)
    }

    fn expected(&self) -> String {
        self.matcher().expected()
    }

    fn describe(&self) -> String {
        self.matcher().describe()
    }

    fn kind(&self) -> Option<&'static str> {
        self.matcher().kind()
    }
}

pub fn exact(expected: impl Into<String>) -> ExactMatcher {
    ExactMatcher {
        expected: expected.into(),
    }
}

pub fn regex(regex: Regex) -> RegexMatcher {
    RegexMatcher { regex }
}

/// Compile a pattern into a [`RegexMatcher`].
pub fn regex_pattern(pattern: &str) -> Result<RegexMatcher, ConfigError> {
    Ok(RegexMatcher {
        regex: Regex::new(pattern)?,
    })
}

pub fn is_not_empty() -> IsNotEmptyMatcher {
    IsNotEmptyMatcher
}

/// Wrap a predicate. An empty `expected` is reported as "matches custom expectation".
pub fn fn_matcher<F>(expected: impl Into<String>, predicate: F) -> FnMatcher
where
    F: Fn(&str) -> Result<bool, MatcherError> + Send + Sync + 'static,
{
    FnMatcher {
        expected: expected.into(),
        predicate: Arc::new(predicate),
    }
}

/// Build the matcher lazily, the first time it is evaluated or described.
pub fn callback<F, M>(factory: F) -> Callback
where
    F: Fn() -> M + Send + Sync + 'static,
    M: Matcher + 'static,
{
    Callback::new(Arc::new(move || Arc::new(factory()) as Arc<dyn Matcher>))
}

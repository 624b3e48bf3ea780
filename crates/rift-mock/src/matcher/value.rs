//! Coercion of raw expectation values into matchers.
//!
//! Setters such as `with_header`, `with_body` and `return_body` accept
//! anything convertible into a [`Value`]. The conversion is closed: every
//! accepted input kind has a variant, and inputs that cannot be used as an
//! expectation land in [`Value::Unsupported`], which turns into a
//! [`ConfigError::UnsupportedDataType`] when the value is applied.

use super::body_matcher::BodyMatcher;
use super::json_matcher::JsonMatcher;
use super::string_matcher::{
    exact, Callback, ExactMatcher, FnMatcher, IsNotEmptyMatcher, RegexMatcher,
};
use super::Matcher;
use crate::error::ConfigError;
use bytes::Bytes;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

type MatcherFactory = dyn Fn() -> Arc<dyn Matcher> + Send + Sync;

/// An expectation value before it is turned into a matcher.
#[derive(Clone)]
pub enum Value {
    Bytes(Vec<u8>),
    Str(String),
    /// String form of a displayable value.
    Display(String),
    Regex(Regex),
    Matcher(Arc<dyn Matcher>),
    /// Builds the matcher lazily on first use.
    Factory(Arc<MatcherFactory>),
    Unsupported(&'static str),
}

impl Value {
    /// Use the `Display` rendering of a value as an exact expectation.
    pub fn display(value: impl fmt::Display) -> Self {
        Value::Display(value.to_string())
    }

    pub fn factory<F, M>(factory: F) -> Self
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: Matcher + 'static,
    {
        Value::Factory(Arc::new(move || Arc::new(factory()) as Arc<dyn Matcher>))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bytes(b) => f
                .debug_tuple("Bytes")
                .field(&String::from_utf8_lossy(b))
                .finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Display(s) => f.debug_tuple("Display").field(s).finish(),
            Value::Regex(r) => f.debug_tuple("Regex").field(&r.as_str()).finish(),
            Value::Matcher(m) => f.debug_tuple("Matcher").field(m).finish(),
            Value::Factory(_) => f.write_str("Factory(..)"),
            Value::Unsupported(kind) => f.debug_tuple("Unsupported").field(kind).finish(),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Str(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Value {
    fn from(v: &[u8; N]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Regex> for Value {
    fn from(v: Regex) -> Self {
        Value::Regex(v)
    }
}

impl From<Arc<dyn Matcher>> for Value {
    fn from(v: Arc<dyn Matcher>) -> Self {
        Value::Matcher(v)
    }
}

/// Only JSON strings are usable as plain expectations; other JSON values are rejected.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Null => Value::Unsupported("null"),
            serde_json::Value::Bool(_) => Value::Unsupported("bool"),
            serde_json::Value::Number(_) => Value::Unsupported("number"),
            serde_json::Value::Array(_) => Value::Unsupported("array"),
            serde_json::Value::Object(_) => Value::Unsupported("object"),
        }
    }
}

macro_rules! impl_from_matcher {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Matcher(Arc::new(v))
                }
            }
        )*
    };
}

impl_from_matcher!(
    ExactMatcher,
    RegexMatcher,
    JsonMatcher,
    IsNotEmptyMatcher,
    FnMatcher,
    Callback,
);

/// Turn a value into a matcher.
///
/// Bytes, strings and displayable values match exactly, regexes match by
/// pattern, matchers are used as they are and factories are evaluated lazily.
pub fn match_value(value: impl Into<Value>) -> Result<Arc<dyn Matcher>, ConfigError> {
    match value.into() {
        Value::Bytes(b) => Ok(Arc::new(exact(String::from_utf8_lossy(&b)))),
        Value::Str(s) | Value::Display(s) => Ok(Arc::new(exact(s))),
        Value::Regex(r) => Ok(Arc::new(super::string_matcher::regex(r))),
        Value::Matcher(m) => Ok(m),
        Value::Factory(f) => Ok(Arc::new(Callback::new(f))),
        Value::Unsupported(kind) => Err(ConfigError::UnsupportedDataType(kind)),
    }
}

/// Turn a value into a body matcher.
pub fn match_body(value: impl Into<Value>) -> Result<BodyMatcher, ConfigError> {
    match_value(value).map(BodyMatcher::new)
}

/// Bytes of a fixed response payload.
///
/// A regex contributes its pattern. Matchers have no payload and are rejected.
pub fn to_bytes(value: impl Into<Value>) -> Result<Vec<u8>, ConfigError> {
    match value.into() {
        Value::Bytes(b) => Ok(b),
        Value::Str(s) | Value::Display(s) => Ok(s.into_bytes()),
        Value::Regex(r) => Ok(r.as_str().as_bytes().to_vec()),
        Value::Matcher(_) => Err(ConfigError::UnsupportedDataType("matcher")),
        Value::Factory(_) => Err(ConfigError::UnsupportedDataType("matcher factory")),
        Value::Unsupported(kind) => Err(ConfigError::UnsupportedDataType(kind)),
    }
}

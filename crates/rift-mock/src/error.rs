//! Error types shared by the matchers and the expectation builders.
//!
//! Request mismatches live in [`crate::planner::MatchError`]; handler and
//! transport failures live next to the code that produces them.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Mistakes in test setup.
///
/// These are raised while an expectation or the server is being configured and
/// are never produced while a request is being served.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported data type: {0}")]
    UnsupportedDataType(&'static str),
    #[error("could not marshal json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not read config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("could not find file {}: {source}", path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),
    #[error("invalid status code: {0}")]
    InvalidStatusCode(u16),
    #[error("could not change planner: planner is not empty")]
    PlannerNotEmpty,
}

/// Failure of a value matcher while evaluating an actual value.
///
/// A plain mismatch is not an error; matchers report it as `Ok(false)`.
#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("{0}")]
    Custom(String),
    #[error("{0}")]
    Read(#[from] io::Error),
    #[error("invalid expected json: {0}")]
    InvalidExpectedJson(String),
}

impl MatcherError {
    /// Build an error from any displayable message, for use inside custom predicates.
    pub fn custom(message: impl std::fmt::Display) -> Self {
        MatcherError::Custom(message.to_string())
    }
}

/// Panic with a configuration error, the way setup mistakes halt a test.
#[track_caller]
pub(crate) fn must<T>(result: Result<T, ConfigError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}

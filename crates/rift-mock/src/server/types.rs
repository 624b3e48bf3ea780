//! Type definitions for the mock server.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// A request that matched an expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedRequest {
    pub method: String,
    pub uri: String,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// RFC 3339 time at which the request was matched.
    pub timestamp: String,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {0}: {1}")]
    Bind(SocketAddr, #[source] io::Error),
    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] io::Error),
}

/// Expectations still pending when the test ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmetExpectations {
    expectations: Vec<String>,
}

impl UnmetExpectations {
    pub(crate) fn new(expectations: Vec<String>) -> Self {
        Self { expectations }
    }

    /// One rendered entry per unmet expectation.
    pub fn expectations(&self) -> &[String] {
        &self.expectations
    }
}

impl fmt::Display for UnmetExpectations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "there are remaining expectations that were not met:")?;
        for expectation in &self.expectations {
            write!(f, "- {expectation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for UnmetExpectations {}

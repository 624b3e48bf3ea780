//! Type definitions for expectations.

use crate::request::Request;
use crate::response::{ResponseError, ResponseWriter};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

/// How many more times an expectation may be fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeat {
    /// Never retired by count.
    #[default]
    Unlimited,
    /// Calls left. `Times(0)` means the expectation is used up.
    Times(u32),
}

impl Repeat {
    /// `0` is treated as unlimited.
    pub fn times(n: u32) -> Self {
        match n {
            0 => Repeat::Unlimited,
            n => Repeat::Times(n),
        }
    }

    /// Remaining calls as a number, `0` for unlimited or used up.
    pub fn remaining(&self) -> u32 {
        match self {
            Repeat::Unlimited => 0,
            Repeat::Times(n) => *n,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Repeat::Unlimited)
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Repeat::Times(0))
    }

    pub(crate) fn decrement(self) -> Self {
        match self {
            Repeat::Unlimited => Repeat::Unlimited,
            Repeat::Times(n) => Repeat::Times(n.saturating_sub(1)),
        }
    }
}

/// Artificial delay applied before responding.
#[derive(Clone, Default)]
pub enum Waiter {
    #[default]
    NoWait,
    Duration(Duration),
    /// Wait for a message on the channel, or for the channel to close.
    Signal(Arc<AsyncMutex<mpsc::Receiver<()>>>),
}

impl Waiter {
    pub async fn wait(&self) {
        match self {
            Waiter::NoWait => {}
            Waiter::Duration(duration) => tokio::time::sleep(*duration).await,
            Waiter::Signal(signal) => {
                let mut receiver = signal.lock().await;
                let _ = receiver.recv().await;
            }
        }
    }
}

impl fmt::Debug for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Waiter::NoWait => f.write_str("NoWait"),
            Waiter::Duration(d) => f.debug_tuple("Duration").field(d).finish(),
            Waiter::Signal(_) => f.write_str("Signal"),
        }
    }
}

/// Produces the response body for a matched request.
pub type ResponseHandler = Arc<dyn Fn(&mut Request) -> anyhow::Result<Vec<u8>> + Send + Sync>;

/// Failure while serving a matched request.
#[derive(Debug, Error)]
pub enum HandleError {
    #[error("{0:#}")]
    Handler(anyhow::Error),
    #[error(transparent)]
    Response(#[from] ResponseError),
}

/// Serves a request that was matched to an expectation.
#[async_trait]
pub trait ExpectationHandler: Send + Sync {
    /// Write the response for `request` into `writer`.
    ///
    /// `default_headers` are the server-wide response headers; headers set on
    /// the expectation take precedence. When the handler fails, a `500`
    /// carrying the error text is written before the error is returned.
    async fn handle(
        &self,
        writer: &mut ResponseWriter,
        request: &mut Request,
        default_headers: &BTreeMap<String, String>,
    ) -> Result<(), HandleError>;
}

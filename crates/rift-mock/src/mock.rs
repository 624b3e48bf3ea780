//! Helpers for building servers from a list of setup functions.
//!
//! ```no_run
//! # async fn example() {
//! use rift_mock::{mock_server, MockServer};
//!
//! let server = mock_server([|s: &MockServer| {
//!     s.expect_get("/health").return_body("ok");
//! }])
//! .await;
//! # }
//! ```

use crate::server::MockServer;
use crate::testing::TestingT;
use std::sync::Arc;

type Setup = Box<dyn Fn(&MockServer) + Send + Sync>;

/// Start a server and apply `mocks` to it in order.
pub async fn mock_server<I, F>(mocks: I) -> MockServer
where
    I: IntoIterator<Item = F>,
    F: FnOnce(&MockServer),
{
    let server = MockServer::start().await;
    for mock in mocks {
        mock(&server);
    }
    server
}

/// Collect setup functions to be applied to a server started later.
pub fn new_mocker<I, F>(mocks: I) -> Mocker
where
    I: IntoIterator<Item = F>,
    F: Fn(&MockServer) + Send + Sync + 'static,
{
    Mocker {
        mocks: mocks.into_iter().map(|m| Box::new(m) as Setup).collect(),
    }
}

/// A reusable server recipe.
pub struct Mocker {
    mocks: Vec<Setup>,
}

impl Mocker {
    pub fn new() -> Self {
        Self { mocks: Vec::new() }
    }

    /// Add a setup function.
    pub fn with<F>(mut self, mock: F) -> Self
    where
        F: Fn(&MockServer) + Send + Sync + 'static,
    {
        self.mocks.push(Box::new(mock));
        self
    }

    /// Start a server bound to `test`.
    ///
    /// When the test finishes, unmet expectations are reported to it and the
    /// server is closed.
    pub async fn start(&self, test: Arc<dyn TestingT>) -> Arc<MockServer> {
        let server = Arc::new(MockServer::start().await);
        server.with_test(test.clone());

        for mock in &self.mocks {
            mock(&server);
        }

        let cleanup = Arc::clone(&server);
        test.cleanup(Box::new(move || {
            cleanup.report_unmet();
            cleanup.close();
        }));

        server
    }
}

impl Default for Mocker {
    fn default() -> Self {
        Self::new()
    }
}

//! Test framework glue.
//!
//! The server reports failures through a [`TestingT`]. [`TestRecorder`] is a
//! ready-made implementation that collects failures and runs cleanups.

use crate::request::canonical_header_key;
use hyper::HeaderMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// The two operations the server needs from a test framework.
pub trait TestingT: Send + Sync {
    /// Report a test failure.
    fn errorf(&self, message: &str);
    /// Run `f` when the test completes.
    fn cleanup(&self, f: Box<dyn FnOnce() + Send>);
}

type Cleanup = Box<dyn FnOnce() + Send>;

/// Records reported failures and registered cleanups.
///
/// Call [`finish`](Self::finish) at the end of the test. Cleanups still pending
/// when the recorder is dropped run at that point.
#[derive(Default)]
pub struct TestRecorder {
    errors: Mutex<Vec<String>>,
    cleanups: Mutex<Vec<Cleanup>>,
}

impl TestRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    pub fn failed(&self) -> bool {
        !self.errors.lock().is_empty()
    }

    /// Run pending cleanups, most recently registered first, and return the failures.
    pub fn finish(&self) -> Vec<String> {
        self.run_cleanups();
        self.errors()
    }

    fn run_cleanups(&self) {
        loop {
            // Released before the cleanup runs, cleanups may register more.
            let Some(cleanup) = self.cleanups.lock().pop() else {
                break;
            };
            cleanup();
        }
    }
}

impl TestingT for TestRecorder {
    fn errorf(&self, message: &str) {
        self.errors.lock().push(message.to_string());
    }

    fn cleanup(&self, f: Box<dyn FnOnce() + Send>) {
        self.cleanups.lock().push(f);
    }
}

impl Drop for TestRecorder {
    fn drop(&mut self) {
        self.run_cleanups();
    }
}

/// Assert that `headers` contains every header in `contains`.
///
/// Names are compared in canonical form.
///
/// # Panics
///
/// When a header is missing or has a different value.
#[track_caller]
pub fn assert_header_contains<I, K, V>(headers: &HeaderMap, contains: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut expected = BTreeMap::new();
    let mut actual = BTreeMap::new();

    for (name, value) in contains {
        let name = name.as_ref();
        let key = canonical_header_key(name);

        if let Some(found) = headers.get(name) {
            actual.insert(
                key.clone(),
                String::from_utf8_lossy(found.as_bytes()).into_owned(),
            );
        }
        expected.insert(key, value.into());
    }

    assert_eq!(expected, actual, "response headers do not match");
}

//! Core expectation struct and its builder methods.
//!
//! Setters take `&self` and return `&Self` so they chain off the handle the
//! server returns:
//!
//! ```ignore
//! server
//!     .expect_post("/create")
//!     .with_header("Authorization", "Bearer token")
//!     .with_body(r#"{"foo":"bar"}"#)
//!     .return_code(201)
//!     .return_body(r#"{"id":1,"foo":"bar"}"#);
//! ```
//!
//! Setters that can fail on bad input panic with the configuration error;
//! each has a `try_` twin returning it instead.

use super::response::merge_headers;
use super::types::{ExpectationHandler, HandleError, Repeat, ResponseHandler, Waiter};
use crate::error::{must, ConfigError};
use crate::matcher::{self, BodyMatcher, HeaderMatcher, JsonMatcher, Matcher, Value};
use crate::planner;
use crate::request::Request;
use crate::response::ResponseWriter;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use hyper::{Method, StatusCode};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, warn};

/// One expected request and the response it gets.
pub struct RequestExpectation {
    method: Method,
    state: Mutex<ExpectationState>,
    /// Held across wait, handler and write, serializing calls to this expectation.
    gate: AsyncMutex<()>,
}

struct ExpectationState {
    uri: Arc<dyn Matcher>,
    header: HeaderMatcher,
    body: Option<Arc<BodyMatcher>>,
    status: StatusCode,
    response_headers: BTreeMap<String, String>,
    handler: ResponseHandler,
    repeat: Repeat,
    fulfilled: u32,
    waiter: Waiter,
}

impl RequestExpectation {
    /// Create an expectation that matches `method` and `uri` any number of times
    /// and answers `200` with an empty body.
    ///
    /// # Panics
    ///
    /// If `uri` cannot be used as a matcher.
    #[track_caller]
    pub fn new(method: Method, uri: impl Into<Value>) -> Self {
        must(Self::try_new(method, uri))
    }

    pub fn try_new(method: Method, uri: impl Into<Value>) -> Result<Self, ConfigError> {
        Ok(Self {
            method,
            state: Mutex::new(ExpectationState {
                uri: matcher::match_value(uri)?,
                header: HeaderMatcher::new(),
                body: None,
                status: StatusCode::OK,
                response_headers: BTreeMap::new(),
                handler: Arc::new(|_| Ok(Vec::new())),
                repeat: Repeat::Unlimited,
                fulfilled: 0,
                waiter: Waiter::NoWait,
            }),
            gate: AsyncMutex::new(()),
        })
    }

    /// Expect a header value. The value may be a string, bytes, a regex or any matcher.
    #[track_caller]
    pub fn with_header(&self, name: impl Into<String>, value: impl Into<Value>) -> &Self {
        must(self.try_with_header(name, value))
    }

    pub fn try_with_header(
        &self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&Self, ConfigError> {
        let matcher = matcher::match_value(value)?;
        self.state.lock().header.insert(name, matcher);
        Ok(self)
    }

    #[track_caller]
    pub fn with_headers<I, K, V>(&self, headers: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        must(self.try_with_headers(headers))
    }

    pub fn try_with_headers<I, K, V>(&self, headers: I) -> Result<&Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in headers {
            self.try_with_header(name, value)?;
        }
        Ok(self)
    }

    /// Expect a request body. Strings and bytes match exactly; regexes and
    /// matchers are applied as they are.
    #[track_caller]
    pub fn with_body(&self, body: impl Into<Value>) -> &Self {
        must(self.try_with_body(body))
    }

    pub fn try_with_body(&self, body: impl Into<Value>) -> Result<&Self, ConfigError> {
        let matcher = matcher::match_body(body)?;
        self.state.lock().body = Some(Arc::new(matcher));
        Ok(self)
    }

    /// Expect a JSON body equal to the serialized value.
    #[track_caller]
    pub fn with_body_json<T: Serialize + ?Sized>(&self, value: &T) -> &Self {
        must(self.try_with_body_json(value))
    }

    pub fn try_with_body_json<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<&Self, ConfigError> {
        let body = serde_json::to_string(value)?;
        self.try_with_body(JsonMatcher::new(body))
    }

    /// Expect a JSON body given as text. `<ignore-diff>` values are honored.
    pub fn with_body_json_str(&self, body: impl Into<String>) -> &Self {
        let matcher = BodyMatcher::new(Arc::new(JsonMatcher::new(body)));
        self.state.lock().body = Some(Arc::new(matcher));
        self
    }

    #[track_caller]
    pub fn return_code(&self, code: u16) -> &Self {
        must(self.try_return_code(code))
    }

    pub fn try_return_code(&self, code: u16) -> Result<&Self, ConfigError> {
        let status =
            StatusCode::from_u16(code).map_err(|_| ConfigError::InvalidStatusCode(code))?;
        self.state.lock().status = status;
        Ok(self)
    }

    pub fn return_header(&self, name: impl Into<String>, value: impl Into<String>) -> &Self {
        self.state
            .lock()
            .response_headers
            .insert(name.into(), value.into());
        self
    }

    /// Replace all response headers.
    pub fn return_headers<I, K, V>(&self, headers: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.state.lock().response_headers = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Respond with a fixed body: a string, bytes or a displayable value.
    #[track_caller]
    pub fn return_body(&self, body: impl Into<Value>) -> &Self {
        must(self.try_return_body(body))
    }

    pub fn try_return_body(&self, body: impl Into<Value>) -> Result<&Self, ConfigError> {
        let body = matcher::to_bytes(body)?;
        Ok(self.run(move |_| Ok(body.clone())))
    }

    /// Respond with the value serialized as JSON, on every call.
    pub fn return_json<T>(&self, value: T) -> &Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.run(move |_| serde_json::to_vec(&value).context("could not marshal json"))
    }

    /// Respond with the content of a file, read on every call.
    ///
    /// # Panics
    ///
    /// If the file does not exist.
    #[track_caller]
    pub fn return_file(&self, path: impl AsRef<Path>) -> &Self {
        must(self.try_return_file(path))
    }

    pub fn try_return_file(&self, path: impl AsRef<Path>) -> Result<&Self, ConfigError> {
        let path: PathBuf = path.as_ref().components().collect();

        std::fs::metadata(&path).map_err(|source| ConfigError::FileNotFound {
            path: path.clone(),
            source,
        })?;

        Ok(self.run(move |_| {
            std::fs::read(&path).with_context(|| format!("could not read file {}", path.display()))
        }))
    }

    /// Produce the response body with a custom handler.
    pub fn run<F>(&self, handler: F) -> &Self
    where
        F: Fn(&mut Request) -> anyhow::Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.state.lock().handler = Arc::new(handler);
        self
    }

    pub fn once(&self) -> &Self {
        self.times(1)
    }

    pub fn twice(&self) -> &Self {
        self.times(2)
    }

    /// Limit the number of matches. `0` means unlimited.
    pub fn times(&self, n: u32) -> &Self {
        self.state.lock().repeat = Repeat::times(n);
        self
    }

    pub fn unlimited_times(&self) -> &Self {
        self.times(0)
    }

    /// Hold the response until a message arrives on `signal` or it closes.
    ///
    /// Replaces any delay set with [`after`](Self::after).
    pub fn wait_until(&self, signal: mpsc::Receiver<()>) -> &Self {
        self.state.lock().waiter = Waiter::Signal(Arc::new(AsyncMutex::new(signal)));
        self
    }

    /// Delay the response. Replaces any signal set with [`wait_until`](Self::wait_until).
    pub fn after(&self, duration: Duration) -> &Self {
        self.state.lock().waiter = Waiter::Duration(duration);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.state.lock().status
    }

    pub fn waiter(&self) -> Waiter {
        self.state.lock().waiter.clone()
    }
}

impl fmt::Debug for RequestExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RequestExpectation")
            .field("method", &self.method)
            .field("uri", &state.uri.expected())
            .field("header", &state.header)
            .field("body", &state.body)
            .field("status", &state.status)
            .field("response_headers", &state.response_headers)
            .field("repeat", &state.repeat)
            .field("fulfilled", &state.fulfilled)
            .field("waiter", &state.waiter)
            .finish_non_exhaustive()
    }
}

impl planner::Expectation for RequestExpectation {
    fn method(&self) -> Method {
        self.method.clone()
    }

    fn uri_matcher(&self) -> Arc<dyn Matcher> {
        self.state.lock().uri.clone()
    }

    fn header_matcher(&self) -> HeaderMatcher {
        self.state.lock().header.clone()
    }

    fn body_matcher(&self) -> Option<Arc<BodyMatcher>> {
        self.state.lock().body.clone()
    }

    fn remain_times(&self) -> Repeat {
        self.state.lock().repeat
    }

    fn fulfilled(&self) {
        let mut state = self.state.lock();
        state.repeat = state.repeat.decrement();
        state.fulfilled += 1;
    }

    fn fulfilled_times(&self) -> u32 {
        self.state.lock().fulfilled
    }
}

#[async_trait]
impl ExpectationHandler for RequestExpectation {
    async fn handle(
        &self,
        writer: &mut ResponseWriter,
        request: &mut Request,
        default_headers: &BTreeMap<String, String>,
    ) -> Result<(), HandleError> {
        let _gate = self.gate.lock().await;

        let (waiter, handler, status, headers) = {
            let state = self.state.lock();
            (
                state.waiter.clone(),
                state.handler.clone(),
                state.status,
                state.response_headers.clone(),
            )
        };

        waiter.wait().await;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.as_ref()(request)))
            .unwrap_or_else(|payload| {
                Err(anyhow!(
                    "response handler panicked: {}",
                    planner::recovered(payload)
                ))
            });

        let body = match outcome {
            Ok(body) => body,
            Err(err) => {
                let message = format!("{err:#}");
                warn!(
                    method = %self.method,
                    uri = %request.uri(),
                    error = %message,
                    "response handler failed"
                );
                writer.fail(&message);
                return Err(HandleError::Handler(err));
            }
        };

        if let Err(err) = writer.merge_headers(&merge_headers(&headers, default_headers)) {
            writer.fail(&err.to_string());
            return Err(err.into());
        }
        writer.write_header(status);
        writer.write(&body);

        debug!(
            method = %self.method,
            uri = %request.uri(),
            status = status.as_u16(),
            "response written"
        );
        Ok(())
    }
}

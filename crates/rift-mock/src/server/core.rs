//! Core MockServer struct and implementation.

use super::handler::handle_mock_request;
use super::types::{RecordedRequest, ServerError, UnmetExpectations};
use crate::config::ServerConfig;
use crate::error::{must, ConfigError};
use crate::expectation::{ExpectationHandler, RequestExpectation};
use crate::format;
use crate::matcher::Value;
use crate::planner::{self, Planner};
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::testing::TestingT;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Method;
use hyper_util::rt::TokioIo;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tracing::{debug, error, info, warn};

/// Configuration applied to every newly registered expectation.
pub type ExpectationOption = Arc<dyn Fn(&RequestExpectation) + Send + Sync>;

/// A running mock HTTP server.
///
/// The listener is shut down when the server is closed or dropped.
pub struct MockServer {
    state: Arc<ServerState>,
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
}

/// State shared with the connection tasks.
pub(crate) struct ServerState {
    planner: RwLock<Arc<dyn Planner>>,
    default_headers: RwLock<BTreeMap<String, String>>,
    default_expectations: RwLock<Vec<ExpectationOption>>,
    requests: Mutex<Vec<RecordedRequest>>,
    failures: Mutex<Vec<String>>,
    reporter: RwLock<Option<Arc<dyn TestingT>>>,
    /// Held across planning and handling of a single request.
    dispatch: AsyncMutex<()>,
}

impl MockServer {
    /// Start a server on a free loopback port.
    ///
    /// # Panics
    ///
    /// If the listener cannot be bound.
    pub async fn start() -> Self {
        Self::start_with(ServerConfig::default()).await
    }

    /// # Panics
    ///
    /// If the listener cannot be bound.
    pub async fn start_with(config: ServerConfig) -> Self {
        match Self::try_start_with(config).await {
            Ok(server) => server,
            Err(err) => panic!("could not start mock server: {err}"),
        }
    }

    pub async fn try_start() -> Result<Self, ServerError> {
        Self::try_start_with(ServerConfig::default()).await
    }

    pub async fn try_start_with(config: ServerConfig) -> Result<Self, ServerError> {
        let bind_addr = config.socket_addr();
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| ServerError::Bind(bind_addr, e))?;
        let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        info!("Mock server bound to {}", addr);

        let state = Arc::new(ServerState {
            planner: RwLock::new(Arc::new(planner::sequence())),
            default_headers: RwLock::new(config.default_response_headers),
            default_expectations: RwLock::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            reporter: RwLock::new(None),
            dispatch: AsyncMutex::new(()),
        });

        let (shutdown_tx, _) = broadcast::channel(1);
        let mut shutdown_rx = shutdown_tx.subscribe();
        let connection_shutdown = shutdown_tx.clone();
        let state_clone = Arc::clone(&state);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let state = Arc::clone(&state_clone);
                                let mut closed = connection_shutdown.subscribe();
                                tokio::spawn(async move {
                                    let io = TokioIo::new(stream);
                                    let service = service_fn(move |req| {
                                        let state = Arc::clone(&state);
                                        async move { handle_mock_request(req, state).await }
                                    });
                                    let conn = http1::Builder::new().serve_connection(io, service);
                                    tokio::pin!(conn);

                                    // Idle keep-alive connections close with the server.
                                    let result = tokio::select! {
                                        result = conn.as_mut() => result,
                                        _ = closed.recv() => {
                                            conn.as_mut().graceful_shutdown();
                                            conn.as_mut().await
                                        }
                                    };
                                    if let Err(e) = result {
                                        debug!("Connection error on {}: {}", addr, e);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Accept error on {}: {}", addr, e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Mock server on {} shutting down", addr);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            state,
            addr,
            shutdown_tx,
        })
    }

    /// Base URL, e.g. `http://127.0.0.1:49152`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and close the open ones once their
    /// in-flight request is answered.
    pub fn close(&self) {
        // No receiver left means the accept loop is already gone.
        let _ = self.shutdown_tx.send(());
    }

    /// Report failures to a test framework as well as to the log.
    pub fn with_test(&self, test: Arc<dyn TestingT>) -> &Self {
        *self.state.reporter.write() = Some(test);
        self
    }

    /// Swap the planning strategy.
    ///
    /// # Panics
    ///
    /// If expectations are already registered.
    #[track_caller]
    pub fn with_planner(&self, planner: impl Planner + 'static) -> &Self {
        must(self.try_with_planner(planner))
    }

    pub fn try_with_planner(&self, planner: impl Planner + 'static) -> Result<&Self, ConfigError> {
        let mut current = self.state.planner.write();
        if !current.is_empty() {
            return Err(ConfigError::PlannerNotEmpty);
        }
        *current = Arc::new(planner);
        Ok(self)
    }

    /// Set the headers added to every matched response.
    pub fn with_default_response_headers<I, K, V>(&self, headers: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        *self.state.default_headers.write() = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Register configuration applied to every expectation created afterwards.
    pub fn with_default_expectations<F>(&self, option: F) -> &Self
    where
        F: Fn(&RequestExpectation) + Send + Sync + 'static,
    {
        self.state
            .default_expectations
            .write()
            .push(Arc::new(option));
        self
    }

    /// Expect a request. The expectation is fulfilled once unless told otherwise.
    ///
    /// # Panics
    ///
    /// If `uri` cannot be used as a matcher.
    #[track_caller]
    pub fn expect(&self, method: Method, uri: impl Into<Value>) -> Arc<RequestExpectation> {
        let expectation = Arc::new(RequestExpectation::new(method, uri));
        expectation.once();

        for option in self.state.default_expectations.read().iter() {
            option(&expectation);
        }

        self.state.planner.read().expect(expectation.clone());
        expectation
    }

    #[track_caller]
    pub fn expect_get(&self, uri: impl Into<Value>) -> Arc<RequestExpectation> {
        self.expect(Method::GET, uri)
    }

    #[track_caller]
    pub fn expect_head(&self, uri: impl Into<Value>) -> Arc<RequestExpectation> {
        self.expect(Method::HEAD, uri)
    }

    #[track_caller]
    pub fn expect_post(&self, uri: impl Into<Value>) -> Arc<RequestExpectation> {
        self.expect(Method::POST, uri)
    }

    #[track_caller]
    pub fn expect_put(&self, uri: impl Into<Value>) -> Arc<RequestExpectation> {
        self.expect(Method::PUT, uri)
    }

    #[track_caller]
    pub fn expect_patch(&self, uri: impl Into<Value>) -> Arc<RequestExpectation> {
        self.expect(Method::PATCH, uri)
    }

    #[track_caller]
    pub fn expect_delete(&self, uri: impl Into<Value>) -> Arc<RequestExpectation> {
        self.expect(Method::DELETE, uri)
    }

    /// Drop every pending expectation.
    pub fn reset_expectations(&self) {
        self.state.planner.read().reset();
    }

    /// Check that every expectation was fulfilled.
    pub fn expectations_were_met(&self) -> Result<(), UnmetExpectations> {
        let remain = self.state.planner.read().remain();

        let unmet: Vec<String> = remain
            .iter()
            .filter(|expected| {
                let repeat = expected.remain_times();
                let used = expected.fulfilled_times() > 0;
                !((repeat.is_unlimited() || repeat.is_exhausted()) && used)
            })
            .map(|expected| {
                let mut line = String::new();
                // Writing into a String cannot fail.
                let _ = format::expected_request(
                    &mut line,
                    expected.method().as_str(),
                    expected.uri_matcher().as_ref(),
                    &expected.header_matcher(),
                    expected.body_matcher().as_deref(),
                    expected.fulfilled_times(),
                    expected.remain_times().remaining(),
                );
                line
            })
            .collect();

        if unmet.is_empty() {
            Ok(())
        } else {
            Err(UnmetExpectations::new(unmet))
        }
    }

    /// Requests that matched an expectation, oldest first.
    pub fn received_requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    /// Failures reported while serving requests.
    pub fn failures(&self) -> Vec<String> {
        self.state.failures.lock().clone()
    }

    /// Serve a request without going through the listener.
    #[cfg(test)]
    pub(crate) async fn serve(&self, mut request: Request) -> ResponseWriter {
        let mut writer = ResponseWriter::new();
        self.state.serve(&mut writer, &mut request).await;
        writer
    }

    /// Report unmet expectations to the attached test, if any.
    pub(crate) fn report_unmet(&self) {
        if let Err(err) = self.expectations_were_met() {
            self.state.report(&err.to_string());
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.close();
    }
}

impl ServerState {
    /// Plan and serve one request.
    pub(crate) async fn serve(&self, writer: &mut ResponseWriter, request: &mut Request) {
        let _dispatch = self.dispatch.lock().await;

        let planner = self.planner.read().clone();

        if planner.is_empty() {
            let message = match request.body_bytes() {
                Ok(body) if !body.is_empty() => format!(
                    "unexpected request received: {} {}, body:\n{}",
                    request.method(),
                    request.uri(),
                    String::from_utf8_lossy(&body)
                ),
                _ => format!(
                    "unexpected request received: {} {}",
                    request.method(),
                    request.uri()
                ),
            };
            self.fail(writer, &message);
            return;
        }

        let expected = match planner.plan(request) {
            Ok(expected) => expected,
            Err(err) => {
                self.fail(writer, &err.to_string());
                return;
            }
        };

        self.record(request);

        let default_headers = self.default_headers.read().clone();
        if let Err(err) = expected.handle(writer, request, &default_headers).await {
            self.report(&err.to_string());
        }
    }

    fn record(&self, request: &mut Request) {
        let snapshot = request.snapshot();
        let body = (!snapshot.body.is_empty())
            .then(|| String::from_utf8_lossy(&snapshot.body).into_owned());

        self.requests.lock().push(RecordedRequest {
            method: snapshot.method,
            uri: snapshot.uri,
            headers: snapshot.headers,
            body,
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
    }

    fn fail(&self, writer: &mut ResponseWriter, message: &str) {
        warn!("Request did not match: {}", message);
        self.report(message);
        writer.fail(message);
    }

    fn report(&self, message: &str) {
        error!("{}", message);
        self.failures.lock().push(message.to_string());

        let reporter = self.reporter.read().clone();
        if let Some(reporter) = reporter {
            reporter.errorf(message);
        }
    }
}

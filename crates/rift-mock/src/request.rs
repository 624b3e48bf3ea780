//! Incoming request model.
//!
//! The hyper request is converted into a [`Request`] before it reaches the
//! planner. Its body can be read any number of times: the first read drains the
//! underlying source and keeps the bytes, later reads replay them. Matchers,
//! diagnostics and response handlers all see the same payload.

use bytes::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, HOST};
use hyper::Method;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read};

/// A request received by the mock server.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Body,
}

impl Request {
    pub fn new(method: Method, uri: impl Into<String>, headers: HeaderMap, body: Body) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers,
            body,
        }
    }

    /// Start building a `GET /` request with no headers and an empty body.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request target as sent by the client, path plus query.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, or an empty string when it is missing.
    pub fn header(&self, name: &str) -> String {
        self.headers
            .get(name)
            .map(header_value_string)
            .unwrap_or_default()
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Read the whole body. The body stays readable afterwards.
    pub fn body_bytes(&mut self) -> io::Result<Bytes> {
        self.body.read_all()
    }

    /// Capture the request for diagnostics.
    ///
    /// Header names are canonicalized and only the first value of each header is
    /// kept. `Host` is left out because it describes the connection rather than
    /// the request. A body that cannot be read is replaced by the read error.
    pub fn snapshot(&mut self) -> RequestSnapshot {
        let headers = self
            .headers
            .keys()
            .filter(|name| *name != HOST)
            .filter_map(|name| {
                self.headers
                    .get(name)
                    .map(|value| (canonical_header_key(name.as_str()), header_value_string(value)))
            })
            .collect();

        let body = match self.body.read_all() {
            Ok(bytes) => bytes.to_vec(),
            Err(err) => format!("could not read request body: {err}").into_bytes(),
        };

        RequestSnapshot {
            method: self.method.to_string(),
            uri: self.uri.clone(),
            headers,
            body,
        }
    }
}

/// Point-in-time copy of a request used in mismatch reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSnapshot {
    pub method: String,
    pub uri: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

/// Re-readable request body.
pub struct Body {
    state: BodyState,
}

enum BodyState {
    Stream(Box<dyn Read + Send>),
    Buffered(Bytes),
    Failed { kind: io::ErrorKind, message: String },
}

impl Body {
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            state: BodyState::Buffered(bytes.into()),
        }
    }

    /// A body backed by a reader that is drained on first access.
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self {
            state: BodyState::Stream(Box::new(reader)),
        }
    }

    /// A body whose every read fails with the given error.
    pub fn failed(err: io::Error) -> Self {
        Self {
            state: BodyState::Failed {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }

    /// Read the full payload, buffering it for subsequent reads.
    pub fn read_all(&mut self) -> io::Result<Bytes> {
        if let BodyState::Stream(reader) = &mut self.state {
            let mut buf = Vec::new();
            let result = reader.read_to_end(&mut buf);
            self.state = match result {
                Ok(_) => BodyState::Buffered(Bytes::from(buf)),
                Err(err) => BodyState::Failed {
                    kind: err.kind(),
                    message: err.to_string(),
                },
            };
        }

        match &self.state {
            BodyState::Buffered(bytes) => Ok(bytes.clone()),
            BodyState::Failed { kind, message } => Err(io::Error::new(*kind, message.clone())),
            BodyState::Stream(_) => Ok(Bytes::new()),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            BodyState::Stream(_) => f.write_str("Body(<stream>)"),
            BodyState::Buffered(bytes) => write!(f, "Body({bytes:?})"),
            BodyState::Failed { message, .. } => write!(f, "Body(<failed: {message}>)"),
        }
    }
}

/// Builder for requests fed directly to a planner or a matcher.
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Body,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            uri: "/".to_string(),
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }
}

impl RequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    /// Set a header. Invalid names or values are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Body::from_bytes(body);
        self
    }

    pub fn body_reader(mut self, reader: impl Read + Send + 'static) -> Self {
        self.body = Body::from_reader(reader);
        self
    }

    pub fn body_read_error(mut self, err: io::Error) -> Self {
        self.body = Body::failed(err);
        self
    }

    pub fn build(self) -> Request {
        Request::new(self.method, self.uri, self.headers, self.body)
    }
}

/// Canonical MIME header casing: `content-type` becomes `Content-Type`.
///
/// Names containing characters outside the HTTP token set are returned as is.
pub fn canonical_header_key(name: &str) -> String {
    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return name.to_string();
    }

    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn header_value_string(value: &HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}

use bytes::Bytes;
use http_body_util::Full;
use hyper::http::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Response, StatusCode};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("invalid response header name {0:?}")]
    InvalidHeaderName(String),
    #[error("invalid value for response header {name:?}: {value:?}")]
    InvalidHeaderValue { name: String, value: String },
}

/// Collects the status, headers and body of a response before it is sent.
///
/// The status can be written once; later writes are ignored. Writing body
/// bytes without a status commits `200 OK`.
#[derive(Debug)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    pub fn new() -> Self {
        ResponseWriter {
            status: None,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Set a header, replacing any previous value.
    pub fn header(&mut self, name: &str, value: &str) -> Result<(), ResponseError> {
        let header_name = HeaderName::from_str(name)
            .map_err(|_| ResponseError::InvalidHeaderName(name.to_string()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| ResponseError::InvalidHeaderValue {
                name: name.to_string(),
                value: value.to_string(),
            })?;

        self.headers.insert(header_name, header_value);
        Ok(())
    }

    pub fn merge_headers<'a, H>(&mut self, headers: H) -> Result<(), ResponseError>
    where
        H: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (name, value) in headers {
            self.header(name, value)?;
        }
        Ok(())
    }

    pub fn write_header(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.write_header(StatusCode::OK);
        self.body.extend_from_slice(bytes);
    }

    /// Plain-text `500` carrying a diagnostic message.
    pub fn fail(&mut self, message: &str) {
        self.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        self.write(message.as_bytes());
    }

    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status();
        let mut response = Response::new(Full::new(Bytes::from(self.body)));

        *response.status_mut() = status;
        response.headers_mut().extend(self.headers);
        response
    }
}

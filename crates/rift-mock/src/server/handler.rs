//! Request handling for the mock server.
//!
//! Every request is converted into a [`Request`], planned against the
//! registered expectations and answered by the planned expectation. Failures
//! become `500` responses carrying the diagnostic.

use super::core::ServerState;
use crate::request::{Body, Request};
use crate::response::ResponseWriter;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::Response;
use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use tracing::debug;

/// Handle a request to the mock server.
pub(crate) async fn handle_mock_request(
    req: hyper::Request<Incoming>,
    state: Arc<ServerState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let mut request = into_request(req).await;

    debug!(
        method = %request.method(),
        uri = %request.uri(),
        "received request"
    );

    let mut writer = ResponseWriter::new();
    state.serve(&mut writer, &mut request).await;

    Ok(writer.into_response())
}

async fn into_request(req: hyper::Request<Incoming>) -> Request {
    let (parts, body) = req.into_parts();

    let uri = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let body = match body.collect().await {
        Ok(collected) => Body::from_bytes(collected.to_bytes()),
        Err(e) => Body::failed(io::Error::other(e)),
    };

    Request::new(parts.method, uri, parts.headers, body)
}

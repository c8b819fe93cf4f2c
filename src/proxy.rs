//! Upstream forwarding
//!
//! Relays an admitted request to a backend and the backend's response back
//! to the caller. One attempt per request, no retries.

use crate::error::AppError;
use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, HeaderMap, HeaderName},
    response::Response,
};
use tracing::debug;
use url::Url;

/// Largest request or response body relayed (2 MiB)
pub const MAX_FORWARD_BODY: usize = 2 * 1024 * 1024;

/// Connection-scoped headers that must not be relayed
const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::HOST,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
];

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove(header::UPGRADE);
    headers.remove("keep-alive");
}

/// Upstream URL for a request: base scheme and authority, request path and query
pub fn target_url(base: &Url, request: &Request) -> Url {
    let mut target = base.clone();
    target.set_path(request.uri().path());
    target.set_query(request.uri().query());
    target
}

/// Send `request` to `base` and relay the answer
pub async fn forward(
    client: &reqwest::Client,
    base: &Url,
    request: Request,
) -> Result<Response, AppError> {
    let target = target_url(base, &request);
    let (parts, body) = request.into_parts();

    let body = to_bytes(body, MAX_FORWARD_BODY)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read request body: {}", e)))?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);

    debug!(method = %parts.method, target = %target, "Forwarding request");

    let upstream = client
        .request(parts.method, target.clone())
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("{}: {}", target, e)))?;

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);
    let bytes = read_body_with_limit(upstream, MAX_FORWARD_BODY)
        .await
        .map_err(|e| AppError::Upstream(format!("{}: {}", target, e)))?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Read an upstream body, giving up once it exceeds `limit` bytes
async fn read_body_with_limit(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, String> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| e.to_string())? {
        if body.len() + chunk.len() > limit {
            return Err(format!("response body exceeds {} bytes", limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

//! HTTP middleware: per-request logging.

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

/// Response header carrying the generated request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Logs every request with its method, path, response status, and latency,
/// under a generated request ID that is echoed back in the
/// [`REQUEST_ID_HEADER`] response header so clients can quote it in reports.
pub async fn request_log_middleware(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = Uuid::new_v4().to_string();

    tracing::debug!(%method, path = %path, request_id = %request_id, "incoming request");

    let start = Instant::now();
    let mut response = next.run(req).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms,
        request_id = %request_id,
        "request completed"
    );

    // A v4 UUID is always a valid header value; guard anyway rather than
    // panic inside the middleware stack.
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

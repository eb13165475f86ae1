//! Request ID middleware.
//!
//! Every request runs inside a `request` span carrying its ID, so log lines
//! written by handlers, repositories and outbound clients can be correlated.

use axum::{
    body::Body,
    http::{header::HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for request ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Longest client-supplied ID we echo back.
const MAX_REQUEST_ID_LEN: usize = 128;

fn incoming_request_id(req: &Request<Body>) -> Option<String> {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
}

/// Uses the caller's `X-Request-ID` or generates a UUID v4, runs the request
/// in a span carrying it, and echoes it on the response.
pub async fn trace_id(req: Request<Body>, next: Next) -> Response {
    let request_id = incoming_request_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let start = std::time::Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;

    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
    });

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-request-id"), header_value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(value: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/appointments/today");
        if let Some(v) = value {
            builder = builder.header(REQUEST_ID_HEADER, v);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_incoming_request_id_used() {
        assert_eq!(
            incoming_request_id(&request_with(Some("abc-123"))).as_deref(),
            Some("abc-123")
        );
    }

    #[test]
    fn test_incoming_request_id_rejects_blank_and_oversized() {
        assert!(incoming_request_id(&request_with(Some("   "))).is_none());
        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        assert!(incoming_request_id(&request_with(Some(&long))).is_none());
        assert!(incoming_request_id(&request_with(None)).is_none());
    }
}

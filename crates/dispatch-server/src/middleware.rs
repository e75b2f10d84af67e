//! Correlation-id middleware: every response echoes the request's
//! correlation id, generating one when the caller didn't supply it.
//!
//! Layered alongside `tower-http`'s `trace`/`cors` middleware per
//! SPEC_FULL.md §4.8; kept as a small `axum::middleware::from_fn` rather
//! than `tower-http`'s own `request-id` layer because spec.md requires
//! the id to be a UUID usable as the domain `requestId`, not an opaque
//! tower-http `RequestId`.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

/// Header carrying the correlation id, both on request and response.
pub const CORRELATION_ID_HEADER: &str = "x-request-id";

/// Reads `x-request-id` from the incoming request, generating a fresh
/// UUID v4 when absent, and echoes it back on the response.
pub async fn correlation_id(mut request: Request, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request.extensions_mut().insert(CorrelationId(correlation_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

/// Request-extension wrapper for the correlation id, extracted by handlers
/// that need to fall back to it when a body omits its own `requestId`.
#[derive(Debug, Clone)]
pub struct CorrelationId(pub String);

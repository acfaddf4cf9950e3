//! Request spans.
//!
//! Every request runs inside a span carrying its method, path and request ID,
//! so handler logs correlate with the `x-request-id` the client sees.

use axum::http::Request;
use tracing::Span;

use crate::http::request::RequestIdExt;

/// Span factory for `tower_http::trace::TraceLayer::make_span_with`.
pub fn request_span<B>(request: &Request<B>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request.request_id().unwrap_or("-"),
    )
}

use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{Instrument, debug};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Reuses an incoming `x-request-id` when present, otherwise mints one.
fn request_id(request: &Request<Body>) -> String {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

pub(crate) async fn trace_requests(request: Request<Body>, next: Next) -> Response {
    let id = request_id(&request);
    let span = tracing::info_span!(
        "http.request",
        request_id = %id,
        method = %request.method(),
        route = %request.uri().path(),
    );

    let mut response = next
        .run(request)
        .instrument(span.clone())
        .await;
    span.in_scope(|| debug!("responded {}", response.status()));

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

//! Response headers applied to API paths.

use axum::{
    body::Body,
    http::{HeaderValue, Request, header},
    middleware::Next,
    response::Response,
};

/// API version reported in headers and envelopes.
pub const API_VERSION: &str = "1.0";

const FERTILIZER_CACHE_CONTROL: &str = "public, max-age=60";
const LOOKUP_CACHE_CONTROL: &str = "public, max-age=3600";

/// Cache policy for a request path; `None` for non-API paths.
pub fn cache_control_for(path: &str) -> Option<&'static str> {
    if !path.starts_with("/api/") {
        return None;
    }
    if path.contains("/fertilizers") {
        Some(FERTILIZER_CACHE_CONTROL)
    } else {
        Some(LOOKUP_CACHE_CONTROL)
    }
}

/// Middleware adding caching, version and hardening headers to `/api/` responses.
pub async fn apply_api_headers(request: Request<Body>, next: Next) -> Response {
    let cache_control = cache_control_for(request.uri().path());
    let mut response = next.run(request).await;

    let Some(cache_control) = cache_control else {
        return response;
    };

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
    headers.insert("x-api-version", HeaderValue::from_static(API_VERSION));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));

    response
}

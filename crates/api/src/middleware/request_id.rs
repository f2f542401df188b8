//! Request identification middleware.
//!
//! Every request gets a fresh UUIDv7 identifier. It is stored in the request
//! extensions as [`RequestId`], scoped to the handling task so error
//! rendering can pick it up, attached to a tracing span, and echoed back in
//! the `X-Request-ID` response header.

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

/// Response header carrying the request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Identifier assigned to the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Request id of the request being handled on this task, if any.
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(Clone::clone).ok()
}

/// Middleware assigning a request id and logging request completion.
pub async fn assign_request_id(mut request: Request<Body>, next: Next) -> Response {
    let request_id = RequestId::generate();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id.as_str(),
        method = %request.method(),
        path = %request.uri().path(),
    );

    request.extensions_mut().insert(request_id.clone());

    let mut response = REQUEST_ID
        .scope(request_id.0.clone(), next.run(request))
        .instrument(span.clone())
        .await;

    let status = response.status();
    span.in_scope(|| {
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "request completed");
        } else if status.is_client_error() {
            tracing::warn!(status = status.as_u16(), "request completed");
        } else {
            tracing::info!(status = status.as_u16(), "request completed");
        }
    });

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

//! HTTP route handlers.

pub mod category;
pub mod fertilizers;
pub mod health;
pub mod lookups;

use axum::Router;

use crate::middleware::{apply_api_headers, assign_request_id};
use crate::state::AppState;

/// Assemble every route with the request-id and API header middleware.
///
/// Layers run outermost first: request id, then API headers, then routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(fertilizers::router())
        .merge(category::router())
        .merge(lookups::router())
        .merge(health::router())
        .layer(axum::middleware::from_fn(apply_api_headers))
        .layer(axum::middleware::from_fn(assign_request_id))
        .with_state(state)
}

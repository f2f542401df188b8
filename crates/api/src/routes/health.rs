//! Health check endpoint.
//!
//! Returns 200 OK if the database is reachable, the error envelope with
//! `SERVICE_UNAVAILABLE` otherwise.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: bool,
    cached_types: usize,
}

/// Health check handler.
async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    if !state.database_healthy().await {
        return Err(ApiError::ServiceUnavailable(
            "database is unreachable".to_string(),
        ));
    }

    Ok(Json(HealthResponse {
        status: "healthy",
        database: true,
        cached_types: state.type_cache().type_count(),
    }))
}

/// Create the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

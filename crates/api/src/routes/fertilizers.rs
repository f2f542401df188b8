//! Fertilizer search and record routes.
//!
//! The same search is served to the web client under `/api/public` and to
//! external consumers under `/api/v1`; the latter is tagged with `apiInfo`.

use axum::{
    Extension, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::db::Row;
use crate::error::ApiResult;
use crate::fertilizer::{RawQuery, validate_query_params};
use crate::middleware::RequestId;
use crate::response::{ApiResponse, Pagination};
use crate::state::AppState;

/// Create the fertilizer router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/public/fertilizers", get(search_public))
        .route("/api/public/fertilizers/{id}", get(get_fertilizer))
        .route("/api/v1/fertilizers", get(search_external))
        .route("/api/v1/fertilizers/stats", get(fertilizer_stats))
}

async fn search(
    state: &AppState,
    request_id: &RequestId,
    raw: RawQuery,
) -> ApiResult<ApiResponse<Vec<Row>>> {
    let spec = validate_query_params(&raw)?;
    let result = state.fertilizers().search(&spec).await?;
    let pagination = Pagination::new(result.total, result.page, result.per_page);
    Ok(ApiResponse::paginated(result.rows, request_id, pagination))
}

/// GET /api/public/fertilizers
async fn search_public(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<ApiResponse<Vec<Row>>> {
    search(&state, &request_id, RawQuery::new(params)).await
}

/// GET /api/v1/fertilizers
async fn search_external(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<ApiResponse<Vec<Row>>> {
    Ok(search(&state, &request_id, RawQuery::new(params))
        .await?
        .external())
}

/// GET /api/public/fertilizers/{id}
async fn get_fertilizer(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Row>> {
    let fertilizer = state.fertilizers().get_by_id(&id).await?;
    Ok(ApiResponse::success(fertilizer, &request_id))
}

/// GET /api/v1/fertilizers/stats
async fn fertilizer_stats(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<ApiResponse<Row>> {
    let stats = state.fertilizers().stats().await?;
    Ok(ApiResponse::success(stats, &request_id).external())
}

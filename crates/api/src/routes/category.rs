//! Category routes for the web client.

use axum::{
    Extension, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::error::{ApiError, ApiResult};
use crate::fertilizer::RawQuery;
use crate::lookup::CategoryRecord;
use crate::middleware::RequestId;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Create the category router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/public/categories", get(list_categories))
        .route("/api/public/categories/{id}", get(get_category))
}

/// GET /api/public/categories?type_id=
async fn list_categories(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<ApiResponse<Vec<CategoryRecord>>> {
    let raw = RawQuery::new(params);
    let Some(type_id) = raw.get("type_id") else {
        return Err(ApiError::missing_parameter("type_id", "type_id must be provided"));
    };

    let categories = state.lookups().categories_by_type(type_id).await?;
    Ok(ApiResponse::success(categories, &request_id))
}

/// GET /api/public/categories/{id}
async fn get_category(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<CategoryRecord>> {
    let category = state.lookups().category_by_id(&id).await?;
    Ok(ApiResponse::success(category, &request_id))
}

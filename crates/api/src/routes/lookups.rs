//! Type, company and component lookup routes.

use axum::{
    Extension, Router,
    extract::{Query, State},
    routing::get,
};

use crate::db::Row;
use crate::error::ApiResult;
use crate::fertilizer::RawQuery;
use crate::lookup::TypeRecord;
use crate::middleware::RequestId;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Create the lookup router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/types", get(list_types))
        .route("/api/v1/companies", get(list_companies))
        .route("/api/public/components", get(components_public))
        .route("/api/v1/components", get(components_external))
}

/// GET /api/v1/types
async fn list_types(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<ApiResponse<Vec<TypeRecord>>> {
    let types = state.lookups().types().await?;
    Ok(ApiResponse::success(types, &request_id).external())
}

/// GET /api/v1/companies
async fn list_companies(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<ApiResponse<Vec<String>>> {
    let companies = state.lookups().companies().await?;
    Ok(ApiResponse::success(companies, &request_id).external())
}

/// GET /api/public/components
async fn components_public(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<ApiResponse<Vec<Row>>> {
    let rows = state
        .fertilizers()
        .search_by_components(&RawQuery::new(params))
        .await?;
    Ok(ApiResponse::success(rows, &request_id))
}

/// GET /api/v1/components
async fn components_external(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<ApiResponse<Vec<Row>>> {
    let rows = state
        .fertilizers()
        .search_by_components(&RawQuery::new(params))
        .await?;
    Ok(ApiResponse::success(rows, &request_id).external())
}

//! Success envelope shared by every JSON endpoint.

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::middleware::{API_VERSION, RequestId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub status: &'static str,
    pub version: &'static str,
    pub request_id: String,
    pub timestamp: String,
}

/// Page window over a filtered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub page_count: u64,
}

impl Pagination {
    pub fn new(total: u64, page: u32, per_page: u32) -> Self {
        Self {
            total,
            page,
            per_page,
            page_count: total.div_ceil(u64::from(per_page.max(1))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiInfo {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// `{ meta, data, pagination?, apiInfo? }`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub meta: Meta,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_info: Option<ApiInfo>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, request_id: &RequestId) -> Self {
        Self {
            meta: Meta {
                status: "success",
                version: API_VERSION,
                request_id: request_id.as_str().to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
            data,
            pagination: None,
            api_info: None,
        }
    }

    pub fn paginated(data: T, request_id: &RequestId, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::success(data, request_id)
        }
    }

    /// Mark the response as served by the external versioned API.
    pub fn external(mut self) -> Self {
        self.api_info = Some(ApiInfo { kind: "external" });
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

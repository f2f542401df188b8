//! Application error types.
//!
//! Every error leaving a handler is rendered as the JSON error envelope:
//!
//! ```json
//! { "error": { "code": "...", "message": "...", "details": [...],
//!              "requestId": "...", "timestamp": "..." } }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::middleware::current_request_id;

/// A single field-level problem attached to an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub issue: String,
}

impl ErrorDetail {
    /// Detail bound to a request field.
    pub fn field(field: impl Into<String>, issue: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            issue: issue.into(),
        }
    }

    /// Detail without a field, e.g. a wrapped driver message.
    pub fn issue(issue: impl Into<String>) -> Self {
        Self {
            field: None,
            issue: issue.into(),
        }
    }
}

/// Application errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<ErrorDetail>,
    },

    #[error("{message}")]
    MissingParameter {
        message: String,
        details: Vec<ErrorDetail>,
    },

    #[error("{message}")]
    InvalidParameter {
        message: String,
        details: Vec<ErrorDetail>,
    },

    #[error("{message}")]
    BadRequest {
        message: String,
        details: Vec<ErrorDetail>,
    },

    #[error("{message}")]
    NotFound {
        message: String,
        details: Vec<ErrorDetail>,
    },

    #[error("query execution failed: {0}")]
    Query(String),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("{0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>, details: Vec<ErrorDetail>) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn missing_parameter(field: &str, issue: impl Into<String>) -> Self {
        Self::MissingParameter {
            message: format!("missing required parameter: {field}"),
            details: vec![ErrorDetail::field(field, issue)],
        }
    }

    pub fn invalid_parameter(
        field: &str,
        message: impl Into<String>,
        issue: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            message: message.into(),
            details: vec![ErrorDetail::field(field, issue)],
        }
    }

    /// Malformed JSON sub-payload in a query parameter.
    pub fn malformed_json(field: &str) -> Self {
        Self::BadRequest {
            message: format!("the {field} parameter is not well-formed"),
            details: vec![ErrorDetail::field(field, "must be valid JSON")],
        }
    }

    /// Database failure, keeping the driver message as the detail.
    pub fn query(error: anyhow::Error) -> Self {
        Self::Query(format!("{error:#}"))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::MissingParameter { .. } => "MISSING_PARAMETER",
            ApiError::InvalidParameter { .. } => "INVALID_PARAMETER",
            ApiError::BadRequest { .. } => "BAD_REQUEST",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Query(_) => "QUERY_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. }
            | ApiError::MissingParameter { .. }
            | ApiError::InvalidParameter { .. }
            | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Query(_) | ApiError::Internal(_) | ApiError::ServiceUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Field-level details, empty for errors that carry none.
    pub fn details(&self) -> &[ErrorDetail] {
        match self {
            ApiError::Validation { details, .. }
            | ApiError::MissingParameter { details, .. }
            | ApiError::InvalidParameter { details, .. }
            | ApiError::BadRequest { details, .. }
            | ApiError::NotFound { details, .. } => details,
            ApiError::Query(_) | ApiError::Internal(_) | ApiError::ServiceUnavailable(_) => &[],
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Query(_) => "an error occurred while executing the query".to_string(),
            ApiError::Internal(_) => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    fn public_details(&self) -> Vec<ErrorDetail> {
        match self {
            ApiError::Query(cause) => vec![ErrorDetail::issue(cause.clone())],
            _ => self.details().to_vec(),
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<ErrorDetail>,
    request_id: Option<String>,
    timestamp: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::Internal(e) => {
                tracing::error!(error = %format!("{e:#}"), "internal server error");
            }
            _ if status.is_server_error() => {
                tracing::error!(code = self.code(), error = %self, "request failed");
            }
            _ => {
                tracing::warn!(
                    code = self.code(),
                    error = %self,
                    details = ?self.details(),
                    "request rejected"
                );
            }
        }

        let body = ErrorEnvelope {
            error: ErrorBody {
                code: self.code(),
                message: self.public_message(),
                details: self.public_details(),
                request_id: current_request_id(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;

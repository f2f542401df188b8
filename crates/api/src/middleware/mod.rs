//! HTTP middleware components.
//!
//! Provides request identification and API response headers.

pub mod headers;
pub mod request_id;

pub use headers::{API_VERSION, apply_api_headers};
pub use request_id::{RequestId, assign_request_id, current_request_id};

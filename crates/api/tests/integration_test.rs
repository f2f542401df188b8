#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for the service surface: health, routing and the
//! response headers every request carries.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use fertilizer_test_utils::assert;

use common::TestApp;

#[tokio::test]
async fn test_health_check_returns_healthy() {
    let app = TestApp::seeded().await;
    app.state.type_cache().prewarm().await;

    let response = app.get("/health", &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["database"], true);
    assert_eq!(response.body["cached_types"], 2);
}

#[tokio::test]
async fn test_health_check_reports_closed_pool() {
    let app = TestApp::new().await;
    app.pool.close().await;

    let response = app.get("/health", &[]).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert::error_code(&response.body, "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_health_is_not_an_api_path() {
    let app = TestApp::new().await;

    let response = app.get("/health", &[]).await;

    assert!(response.header("cache-control").is_none());
    assert!(response.header("x-request-id").is_some());
}

#[tokio::test]
async fn test_incoming_request_id_is_replaced() {
    let app = TestApp::new().await;

    let request = Request::get("/api/v1/types")
        .header("x-request-id", "client-chosen")
        .body(Body::empty())
        .unwrap();
    let response = app.request(request).await;

    let id = response.header("x-request-id").unwrap();
    assert_ne!(id, "client-chosen");
    assert_eq!(response.body["meta"]["requestId"], id);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::new().await;

    let response = app.get("/api/public/nothing-here", &[]).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.header("x-request-id").is_some());
    assert_eq!(response.header("x-api-version"), Some("1.0"));
}

#[tokio::test]
async fn test_request_ids_are_unique() {
    let app = TestApp::new().await;

    let first = app.get("/api/v1/companies", &[]).await;
    let second = app.get("/api/v1/companies", &[]).await;

    assert_ne!(
        first.header("x-request-id").unwrap(),
        second.header("x-request-id").unwrap()
    );
}

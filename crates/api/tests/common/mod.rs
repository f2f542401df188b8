#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Each [`TestApp`] runs the real router and services over its own
//! in-memory SQLite database, so tests are isolated and need no external
//! services.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

use fertilizer_api::{AppState, Config, routes};
use fertilizer_test_utils::{seed_category, seed_type, test_fertilizer};

/// Test application wrapper using the real routes and state.
pub struct TestApp {
    router: Router,
    pub pool: SqlitePool,
    pub state: AppState,
}

/// A collected response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestApp {
    /// Create an application over a fresh, migrated, empty database.
    pub async fn new() -> Self {
        let state = AppState::new(&Config::in_memory())
            .await
            .expect("Failed to initialize AppState");
        let pool = state.pool().clone();
        let router = routes::router(state.clone());

        Self {
            router,
            pool,
            state,
        }
    }

    /// Create an application seeded with [`TestApp::seed_registry`].
    pub async fn seeded() -> Self {
        let app = Self::new().await;
        app.seed_registry().await;
        app
    }

    /// Seed a small registry.
    ///
    /// | id | product       | level | company     | reg_date   | N/P/K      | category |
    /// |----|---------------|-------|-------------|------------|------------|----------|
    /// | 1  | Urea 46       | 1     | Acme Agri   | 2019-05-01 | 46/0/0     | 10       |
    /// | 2  | NPK 15-15-15  | 1     | Acme Agri   | 2020-03-15 | 15/15/15   | 11       |
    /// | 3  | Bone Meal     | 2     | Green Farms | 2021-07-20 | 4/20/0     | 20       |
    /// | 4  | Potash 60     | 2     | Green Farms | 2022-01-10 | -/0/60     | 10       |
    /// | 5  | Fish Emulsion | 3     | Ocean_Co    | 2023-02-01 | 5/1/1      | 20       |
    /// | 6  | Pure Organic  | 1     | Acme Agri   | 2018-11-30 | -/-/-      | -        |
    ///
    /// Types: 1 (categories 10, 11), 2 (category 20), 3 (no categories).
    pub async fn seed_registry(&self) {
        let pool = &self.pool;
        seed_type(pool, 1, "Compound").await.unwrap();
        seed_type(pool, 2, "Organic").await.unwrap();
        seed_type(pool, 3, "Liquid").await.unwrap();
        seed_category(pool, 10, "High nitrogen", 1).await.unwrap();
        seed_category(pool, 11, "Balanced", 1).await.unwrap();
        seed_category(pool, 20, "Animal derived", 2).await.unwrap();

        let fixtures = [
            test_fertilizer(1, "Urea 46")
                .with_company("Acme Agri")
                .with_reg_date("2019-05-01")
                .with_npk(46.0, 0.0, 0.0)
                .with_shape("粒状")
                .in_category(10),
            test_fertilizer(2, "NPK 15-15-15")
                .with_company("Acme Agri")
                .with_reg_date("2020-03-15")
                .with_form_name("Triple Fifteen")
                .with_npk(15.0, 15.0, 15.0)
                .in_category(11),
            test_fertilizer(3, "Bone Meal")
                .with_level(2)
                .with_company("Green Farms")
                .with_reg_date("2021-07-20")
                .with_npk(4.0, 20.0, 0.0)
                .with_shape("粉状")
                .with_effect("slow")
                .in_category(20),
            {
                let mut potash = test_fertilizer(4, "Potash 60")
                    .with_level(2)
                    .with_company("Green Farms")
                    .with_reg_date("2022-01-10")
                    .in_category(10);
                potash.phos = Some(0.0);
                potash.k = Some(60.0);
                potash
            },
            test_fertilizer(5, "Fish Emulsion")
                .with_level(3)
                .with_company("Ocean_Co")
                .with_reg_date("2023-02-01")
                .with_npk(5.0, 1.0, 1.0)
                .in_category(20),
            test_fertilizer(6, "Pure Organic")
                .with_company("Acme Agri")
                .with_reg_no("REG-100%")
                .with_reg_date("2018-11-30")
                .with_effect("slow"),
        ];

        for fixture in &fixtures {
            fixture.insert(pool).await.unwrap();
        }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                let text = String::from_utf8_lossy(&bytes);
                panic!("Failed to parse JSON: {text}");
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// GET `path` with the given query parameters, percent-encoded.
    pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> TestResponse {
        let uri = if params.is_empty() {
            path.to_string()
        } else {
            let query: Vec<String> = params
                .iter()
                .map(|(k, v)| {
                    format!("{}={}", urlencoding::encode(k), urlencoding::encode(v))
                })
                .collect();
            format!("{path}?{}", query.join("&"))
        };
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }
}

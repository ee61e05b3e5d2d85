#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Each [`TestApp`] runs the REAL kernel router and state against its own
//! in-memory SQLite database, so tests never share rows and need no
//! external services.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

use quill_kernel::config::Config;
use quill_kernel::state::AppState;
use quill_test_utils::TestUser;

/// Configuration for a private in-memory database.
///
/// Argon2 costs are cut to the minimum so registration stays fast.
pub fn test_config() -> Config {
    Config {
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        database_max_connections: 1,
        jwt_secret: "integration-test-secret-that-is-long-enough".to_string(),
        token_lifetime_secs: 3600,
        cors_allowed_origins: vec!["*".to_string()],
        argon2_memory_kib: 4 * 1024,
        argon2_iterations: 1,
    }
}

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub db: SqlitePool,
    pub state: AppState,
}

impl TestApp {
    /// Create a fresh application with a migrated, empty database.
    pub async fn new() -> Self {
        let state = AppState::new(&test_config())
            .await
            .expect("Failed to initialize AppState");
        let db = state.db().clone();
        let router = quill_kernel::app(state.clone());

        Self { router, db, state }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// Send a JSON request, optionally authenticated, and decode the reply.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.request(request).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }

    pub async fn get_auth(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, Some(token)).await
    }

    pub async fn post(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body), token).await
    }

    pub async fn put(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body), token).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None, token).await
    }

    /// Register a user through the API and return `(user_id, token)`.
    pub async fn register(&self, user: &TestUser) -> (i64, String) {
        let (status, body) = self
            .post("/api/auth/register", user.register_payload(), None)
            .await;
        assert_eq!(status, StatusCode::CREATED, "registration failed: {body}");

        let id = body["data"]["user"]["id"].as_i64().unwrap();
        let token = body["data"]["token"].as_str().unwrap().to_string();
        (id, token)
    }

    /// Create a category and return its id.
    pub async fn create_category(&self, name: &str, parent_id: Option<i64>) -> i64 {
        let payload = match parent_id {
            Some(parent) => quill_test_utils::child_category(name, parent),
            None => quill_test_utils::category(name),
        };
        let (status, body) = self.post("/api/categories", payload, None).await;
        assert_eq!(status, StatusCode::CREATED, "category create failed: {body}");
        body["data"]["id"].as_i64().unwrap()
    }

    /// Create a post and return its id.
    pub async fn create_post(&self, token: &str, title: &str, category_id: i64) -> i64 {
        let (status, body) = self
            .post(
                "/api/posts",
                quill_test_utils::post(title, category_id),
                Some(token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "post create failed: {body}");
        body["data"]["id"].as_i64().unwrap()
    }
}

/// Read a response body as JSON (`Null` when empty or not JSON).
pub async fn response_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

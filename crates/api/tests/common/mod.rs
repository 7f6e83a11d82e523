//! Common test utilities for integration tests.
//!
//! Each test gets its own in-memory SQLite database with migrations applied,
//! a recording e-mail sender and session tokens signed with the test secret.

// Not every helper is used by every test binary.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use domain::services::MockEmailSender;
use persistence::repositories::UserRepository;
use persistence::SqlitePool;
use sharoushi_api::{
    app::{create_app, AppState},
    config::Config,
    services::GoogleClient,
};
use shared::jwt::JwtConfig;

/// A running application wired to an isolated database.
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub email: Arc<MockEmailSender>,
    pub jwt: Arc<JwtConfig>,
}

impl TestApp {
    /// Builds the app with default test configuration.
    pub async fn new() -> Self {
        Self::with_overrides(&[]).await
    }

    /// Builds the app with configuration overrides such as
    /// `("google.calendar_base_url", server_uri)`.
    pub async fn with_overrides(overrides: &[(&str, &str)]) -> Self {
        let config = Config::load_for_test(overrides).expect("Failed to load test config");
        let pool = persistence::db::create_memory_pool()
            .await
            .expect("Failed to create test database");

        let jwt = Arc::new(
            JwtConfig::new(&config.jwt.secret, config.jwt.access_token_expiry_secs)
                .expect("Failed to build JWT config"),
        );
        let email = Arc::new(MockEmailSender::new());
        let google =
            GoogleClient::new(config.google.clone(), pool.clone()).expect("Failed to build client");

        let state = AppState {
            pool: pool.clone(),
            config: Arc::new(config),
            jwt: jwt.clone(),
            email: email.clone(),
            google,
        };

        Self {
            router: create_app(state),
            pool,
            email,
            jwt,
        }
    }

    /// Inserts a user and returns `(user_id, bearer token)`.
    pub async fn create_user(&self, name: &str, email: &str, role: &str) -> (i64, String) {
        let user = UserRepository::new(self.pool.clone())
            .insert(name, Some(email), role)
            .await
            .expect("Failed to insert user");
        let (token, _) = self
            .jwt
            .generate_access_token(user.id, role)
            .expect("Failed to sign token");
        (user.id, token)
    }

    pub async fn staff(&self) -> (i64, String) {
        self.create_user("山田 花子", "yamada@office.example", "staff")
            .await
    }

    pub async fn admin(&self) -> (i64, String) {
        self.create_user("所長", "boss@office.example", "admin").await
    }

    /// Stores a provider access token for the user.
    pub async fn connect_google(&self, token: &str) {
        let request = json_request_with_auth(
            Method::PUT,
            "/api/google/token",
            serde_json::json!({ "access_token": "provider-token", "expires_in": 3600 }),
            token,
        );
        let response = self.send(request).await;
        assert!(response.status().is_success(), "token store failed");
    }

    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        use tower::ServiceExt;
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed")
    }
}

/// Build a JSON request with authentication.
pub fn json_request_with_auth(
    method: Method,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a bodiless request with authentication.
pub fn request_with_auth(method: Method, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn get_request_with_auth(uri: &str, token: &str) -> Request<Body> {
    request_with_auth(Method::GET, uri, token)
}

pub fn delete_request_with_auth(uri: &str, token: &str) -> Request<Body> {
    request_with_auth(Method::DELETE, uri, token)
}

/// Helper to parse JSON response body.
pub async fn parse_response_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}

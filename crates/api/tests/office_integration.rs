//! Integration tests for office data endpoints.
//!
//! Tests cover:
//! - Session token checks on /api routes
//! - Client CRUD and the delete guard
//! - Task creation, filtering, status changes and deletion
//! - Health and page routes

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{
    delete_request_with_auth, get_request_with_auth, json_request_with_auth,
    parse_response_body, TestApp,
};
use serde_json::json;

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .uri("/api/tasks")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let app = TestApp::new().await;
    let response = app
        .send(get_request_with_auth("/api/clients", "not-a-token"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_current_user() {
    let app = TestApp::new().await;
    let (user_id, token) = app.staff().await;

    let response = app.send(get_request_with_auth("/api/users/me", &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["id"], user_id);
    assert_eq!(body["email"], "yamada@office.example");
}

// =============================================================================
// Clients
// =============================================================================

#[tokio::test]
async fn test_client_crud() {
    let app = TestApp::new().await;
    let (_, token) = app.staff().await;

    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/clients",
            json!({
                "name": "株式会社サンプル",
                "contact_person": "佐藤",
                "email": "info@sample.example",
                "employee_count": 40,
                "monthly_fee": 50000
            }),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert_eq!(body["success"], true);
    let id = body["client"]["id"].as_i64().unwrap();

    let response = app
        .send(json_request_with_auth(
            Method::PUT,
            &format!("/api/clients/{}", id),
            json!({ "monthly_fee": 55000 }),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["client"]["monthly_fee"], 55000);
    assert_eq!(body["client"]["contact_person"], "佐藤");

    let response = app
        .send(get_request_with_auth("/api/clients?search=サンプル", &token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["id"], id);

    let response = app
        .send(delete_request_with_auth(&format!("/api/clients/{}", id), &token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(get_request_with_auth(&format!("/api/clients/{}", id), &token))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_client_validation() {
    let app = TestApp::new().await;
    let (_, token) = app.staff().await;

    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/clients",
            json!({ "name": "ABC", "email": "not-an-email" }),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "email");
}

#[tokio::test]
async fn test_delete_client_with_tasks_conflicts() {
    let app = TestApp::new().await;
    let (_, token) = app.staff().await;

    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/clients",
            json!({ "name": "ABC商事" }),
            &token,
        ))
        .await;
    let client_id = parse_response_body(response).await["client"]["id"]
        .as_i64()
        .unwrap();

    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/tasks",
            json!({ "title": "算定基礎届", "client_id": client_id }),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .send(delete_request_with_auth(
            &format!("/api/clients/{}", client_id),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// =============================================================================
// Tasks
// =============================================================================

#[tokio::test]
async fn test_task_lifecycle() {
    let app = TestApp::new().await;
    let (user_id, token) = app.staff().await;

    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/tasks",
            json!({
                "title": "年末調整",
                "priority": "high",
                "task_type": "payroll",
                "due_date": "2099-12-20"
            }),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    let task = &body["task"];
    let id = task["id"].as_i64().unwrap();
    assert_eq!(task["status"], "pending");
    assert_eq!(task["created_by"], user_id);

    let response = app
        .send(get_request_with_auth(
            "/api/tasks?due_from=2099-12-01&due_to=2099-12-31",
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["total"], 1);

    let response = app
        .send(get_request_with_auth("/api/tasks?due_from=12/01/2099", &token))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request_with_auth(
            Method::PUT,
            &format!("/api/tasks/{}/status", id),
            json!({ "status": "completed" }),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["task"]["status"], "completed");

    let response = app
        .send(delete_request_with_auth(&format!("/api/tasks/{}", id), &token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(get_request_with_auth(&format!("/api/tasks/{}", id), &token))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_task_rejects_blank_title() {
    let app = TestApp::new().await;
    let (_, token) = app.staff().await;

    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/tasks",
            json!({ "title": "   " }),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Public routes
// =============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_root_redirects_to_dashboard() {
    let app = TestApp::new().await;
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/admin-dashboard"
    );

    let request = Request::builder()
        .uri("/admin-dashboard")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/html"));
}

//! Integration tests for the subsidy master and application lifecycle.
//!
//! Tests cover:
//! - POST /api/subsidies and /api/subsidies/applications (checklist seeding)
//! - PUT /api/subsidies/applications/:id/checklist/:item_id (progress)
//! - PUT /api/subsidies/applications/:id/status (application number)
//! - GET /api/subsidies/applications/alerts
//! - DELETE /api/subsidies/:id while in use

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{
    delete_request_with_auth, get_request_with_auth, json_request_with_auth,
    parse_response_body, TestApp,
};
use serde_json::{json, Value};

async fn create_client(app: &TestApp, token: &str, name: &str) -> i64 {
    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/clients",
            json!({ "name": name, "employee_count": 12 }),
            token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    parse_response_body(response).await["client"]["id"]
        .as_i64()
        .unwrap()
}

async fn create_subsidy(app: &TestApp, token: &str) -> i64 {
    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/subsidies",
            json!({
                "name": "キャリアアップ助成金",
                "category": "雇用",
                "max_amount": 800000,
                "required_documents": "・就業規則\n・雇用契約書\n",
                "requirements": "雇用保険適用事業所であること",
            }),
            token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert_eq!(body["success"], true);
    body["subsidy"]["id"].as_i64().unwrap()
}

async fn create_application(
    app: &TestApp,
    token: &str,
    subsidy_id: i64,
    client_id: i64,
    deadline: &str,
) -> Value {
    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/subsidies/applications",
            json!({
                "subsidy_id": subsidy_id,
                "client_id": client_id,
                "amount_requested": 570000,
                "submission_deadline": deadline,
            }),
            token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    parse_response_body(response).await["application"].clone()
}

#[tokio::test]
async fn test_application_lifecycle() {
    let app = TestApp::new().await;
    let (_, token) = app.staff().await;
    let client_id = create_client(&app, &token, "ABC商事").await;
    let subsidy_id = create_subsidy(&app, &token).await;

    let deadline = (Utc::now() + Duration::days(20)).format("%Y-%m-%d").to_string();
    let application = create_application(&app, &token, subsidy_id, client_id, &deadline).await;
    let id = application["id"].as_i64().unwrap();

    assert_eq!(application["status"], "planning");
    assert_eq!(application["progress"], 0);
    assert!(application["application_number"].is_null());
    let checklist = application["checklist"].as_array().unwrap();
    let names: Vec<&str> = checklist.iter().map(|i| i["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["就業規則", "雇用契約書", "雇用保険適用事業所であること"]);

    // Completing one of three items gives 33%
    let item_id = checklist[0]["id"].as_i64().unwrap();
    let response = app
        .send(json_request_with_auth(
            Method::PUT,
            &format!("/api/subsidies/applications/{}/checklist/{}", id, item_id),
            json!({ "completed": true }),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["item"]["is_completed"], true);
    assert_eq!(body["progress"], 33);

    // Submission assigns the application number
    let response = app
        .send(json_request_with_auth(
            Method::PUT,
            &format!("/api/subsidies/applications/{}/status", id),
            json!({ "status": "submitted" }),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    let number = body["application"]["application_number"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(number.starts_with("SA-"));
    assert!(number.ends_with(&format!("{:05}", id)));
    assert!(body["application"]["submitted_at"].is_string());

    let response = app
        .send(json_request_with_auth(
            Method::PUT,
            &format!("/api/subsidies/applications/{}/status", id),
            json!({ "status": "approved", "amount_approved": 570000 }),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["application"]["status"], "approved");
    assert_eq!(body["application"]["application_number"], number.as_str());

    let response = app
        .send(get_request_with_auth(
            &format!("/api/subsidies/{}/statistics", subsidy_id),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = parse_response_body(response).await;
    assert_eq!(stats["application_count"], 1);
    assert_eq!(stats["success_count"], 1);
    assert_eq!(stats["success_rate"], 100);
}

#[tokio::test]
async fn test_alerts_exclude_closed_and_far_deadlines() {
    let app = TestApp::new().await;
    let (_, token) = app.staff().await;
    let client_id = create_client(&app, &token, "ABC商事").await;
    let subsidy_id = create_subsidy(&app, &token).await;

    let day = |offset: i64| (Utc::now() + Duration::days(offset)).format("%Y-%m-%d").to_string();
    let soon = create_application(&app, &token, subsidy_id, client_id, &day(5)).await;
    create_application(&app, &token, subsidy_id, client_id, &day(90)).await;
    let cancelled = create_application(&app, &token, subsidy_id, client_id, &day(3)).await;

    let response = app
        .send(json_request_with_auth(
            Method::PUT,
            &format!(
                "/api/subsidies/applications/{}/status",
                cancelled["id"].as_i64().unwrap()
            ),
            json!({ "status": "cancelled" }),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(get_request_with_auth(
            "/api/subsidies/applications/alerts?days=30",
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let alerts = parse_response_body(response).await;
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["application_id"], soon["id"]);
    assert_eq!(alerts[0]["level"], "urgent");
}

#[tokio::test]
async fn test_delete_subsidy_in_use_conflicts() {
    let app = TestApp::new().await;
    let (_, token) = app.staff().await;
    let client_id = create_client(&app, &token, "ABC商事").await;
    let subsidy_id = create_subsidy(&app, &token).await;
    create_application(&app, &token, subsidy_id, client_id, "2099-03-31").await;

    let response = app
        .send(delete_request_with_auth(
            &format!("/api/subsidies/{}", subsidy_id),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Deactivation stays possible
    let response = app
        .send(json_request_with_auth(
            Method::PUT,
            &format!("/api/subsidies/{}/deactivate", subsidy_id),
            json!({}),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["subsidy"]["is_active"], false);

    // An unused subsidy can be removed
    let unused = create_subsidy(&app, &token).await;
    let response = app
        .send(delete_request_with_auth(&format!("/api/subsidies/{}", unused), &token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_application_for_unknown_subsidy_is_not_found() {
    let app = TestApp::new().await;
    let (_, token) = app.staff().await;
    let client_id = create_client(&app, &token, "ABC商事").await;

    let response = app
        .send(json_request_with_auth(
            Method::POST,
            "/api/subsidies/applications",
            json!({ "subsidy_id": 999, "client_id": client_id }),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

//! Subsidy application routes: lifecycle, checklist and deadline alerts.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::subsidy_application::{
    AddChecklistItemRequest, AlertsQuery, ApplicationDetail, ApplicationSummary,
    CreateApplicationRequest, DeadlineAlert, ListApplicationsQuery, UpdateApplicationRequest,
    UpdateApplicationStatusRequest, UpdateChecklistItemRequest,
};
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use super::success;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

/// GET /api/subsidies/applications
pub async fn list_applications(
    State(state): State<AppState>,
    _user: UserAuth,
    Query(query): Query<ListApplicationsQuery>,
) -> Result<Json<Vec<ApplicationSummary>>, ApiError> {
    Ok(Json(state.subsidies().list_applications(&query).await?))
}

/// GET /api/subsidies/applications/:id
pub async fn get_application(
    State(state): State<AppState>,
    _user: UserAuth,
    Path(id): Path<i64>,
) -> Result<Json<ApplicationDetail>, ApiError> {
    Ok(Json(state.subsidies().get_application(id).await?))
}

/// POST /api/subsidies/applications
pub async fn create_application(
    State(state): State<AppState>,
    user: UserAuth,
    Json(request): Json<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    request.validate()?;
    let detail = state
        .subsidies()
        .create_application(&request, user.user_id, Utc::now())
        .await?;
    info!(
        application_id = detail.application.id,
        user_id = user.user_id,
        "Subsidy application created"
    );
    Ok((
        StatusCode::CREATED,
        success("Application created", json!({ "application": detail })),
    ))
}

/// PUT /api/subsidies/applications/:id
pub async fn update_application(
    State(state): State<AppState>,
    _user: UserAuth,
    Path(id): Path<i64>,
    Json(request): Json<UpdateApplicationRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate()?;
    let application = state
        .subsidies()
        .update_application(id, &request, Utc::now())
        .await?;
    Ok(success("Application updated", json!({ "application": application })))
}

/// PUT /api/subsidies/applications/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<i64>,
    Json(request): Json<UpdateApplicationStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate()?;
    let application = state
        .subsidies()
        .update_status(id, &request, Utc::now())
        .await?;
    info!(
        application_id = id,
        status = application.status.as_str(),
        user_id = user.user_id,
        "Application status changed"
    );
    Ok(success(
        format!("Status changed to {}", application.status.label()),
        json!({ "application": application }),
    ))
}

/// POST /api/subsidies/applications/:id/checklist
pub async fn add_checklist_item(
    State(state): State<AppState>,
    _user: UserAuth,
    Path(id): Path<i64>,
    Json(request): Json<AddChecklistItemRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    request.validate()?;
    let item = state
        .subsidies()
        .add_checklist_item(id, &request, Utc::now())
        .await?;
    Ok((
        StatusCode::CREATED,
        success("Checklist item added", json!({ "item": item })),
    ))
}

/// PUT /api/subsidies/applications/:id/checklist/:item_id
pub async fn update_checklist_item(
    State(state): State<AppState>,
    _user: UserAuth,
    Path((id, item_id)): Path<(i64, i64)>,
    Json(request): Json<UpdateChecklistItemRequest>,
) -> Result<Json<Value>, ApiError> {
    let item = state
        .subsidies()
        .update_checklist_item(id, item_id, request.completed, Utc::now())
        .await?;
    let progress = state.subsidies().get_application(id).await?.application.progress;
    Ok(success(
        "Checklist item updated",
        json!({ "item": item, "progress": progress }),
    ))
}

/// DELETE /api/subsidies/applications/:id/checklist/:item_id
pub async fn delete_checklist_item(
    State(state): State<AppState>,
    _user: UserAuth,
    Path((id, item_id)): Path<(i64, i64)>,
) -> Result<Json<Value>, ApiError> {
    state
        .subsidies()
        .delete_checklist_item(id, item_id, Utc::now())
        .await?;
    Ok(success("Checklist item deleted", Value::Null))
}

/// GET /api/subsidies/applications/alerts?days=N
///
/// Open applications whose deadline falls within N days (or has passed).
pub async fn list_alerts(
    State(state): State<AppState>,
    _user: UserAuth,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<Vec<DeadlineAlert>>, ApiError> {
    let window = query
        .days
        .unwrap_or(state.config.subsidies.default_alert_window_days);
    Ok(Json(state.subsidies().list_alerts(window, Utc::now()).await?))
}

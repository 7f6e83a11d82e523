//! Subsidy master routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::subsidy::{
    CreateSubsidyRequest, ListSubsidiesQuery, Subsidy, SubsidyStatistics, UpdateSubsidyRequest,
};
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use super::success;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

/// GET /api/subsidies
pub async fn list_subsidies(
    State(state): State<AppState>,
    _user: UserAuth,
    Query(query): Query<ListSubsidiesQuery>,
) -> Result<Json<Vec<Subsidy>>, ApiError> {
    Ok(Json(state.subsidies().list_subsidies(&query).await?))
}

/// GET /api/subsidies/:id
pub async fn get_subsidy(
    State(state): State<AppState>,
    _user: UserAuth,
    Path(id): Path<i64>,
) -> Result<Json<Subsidy>, ApiError> {
    Ok(Json(state.subsidies().get_subsidy(id).await?))
}

/// POST /api/subsidies
pub async fn create_subsidy(
    State(state): State<AppState>,
    user: UserAuth,
    Json(request): Json<CreateSubsidyRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    request.validate()?;
    let subsidy = state.subsidies().create_subsidy(&request, Utc::now()).await?;
    info!(subsidy_id = subsidy.id, user_id = user.user_id, "Subsidy created");
    Ok((
        StatusCode::CREATED,
        success("Subsidy created", json!({ "subsidy": subsidy })),
    ))
}

/// PUT /api/subsidies/:id
pub async fn update_subsidy(
    State(state): State<AppState>,
    _user: UserAuth,
    Path(id): Path<i64>,
    Json(request): Json<UpdateSubsidyRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate()?;
    let subsidy = state
        .subsidies()
        .update_subsidy(id, &request, Utc::now())
        .await?;
    Ok(success("Subsidy updated", json!({ "subsidy": subsidy })))
}

/// PUT /api/subsidies/:id/deactivate
pub async fn deactivate_subsidy(
    State(state): State<AppState>,
    _user: UserAuth,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let subsidy = state.subsidies().deactivate_subsidy(id, Utc::now()).await?;
    Ok(success("Subsidy deactivated", json!({ "subsidy": subsidy })))
}

/// DELETE /api/subsidies/:id
///
/// 409 while applications reference the subsidy.
pub async fn delete_subsidy(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.subsidies().delete_subsidy(id).await?;
    info!(subsidy_id = id, user_id = user.user_id, "Subsidy deleted via API");
    Ok(success("Subsidy deleted", Value::Null))
}

/// GET /api/subsidies/statistics
pub async fn catalog_statistics(
    State(state): State<AppState>,
    _user: UserAuth,
) -> Result<Json<SubsidyStatistics>, ApiError> {
    Ok(Json(state.subsidies().statistics(None).await?))
}

/// GET /api/subsidies/:id/statistics
pub async fn subsidy_statistics(
    State(state): State<AppState>,
    _user: UserAuth,
    Path(id): Path<i64>,
) -> Result<Json<SubsidyStatistics>, ApiError> {
    Ok(Json(state.subsidies().statistics(Some(id)).await?))
}

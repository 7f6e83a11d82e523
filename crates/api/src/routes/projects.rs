//! Project routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::project::{
    CreateProjectRequest, ListProjectsQuery, Project, UpdateProjectRequest,
};
use persistence::repositories::{ProjectFields, ProjectRepository};
use serde_json::{json, Value};
use shared::validation::parse_date;
use validator::Validate;

use super::success;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Project {} not found", id))
}

/// GET /api/projects
pub async fn list_projects(
    State(state): State<AppState>,
    _user: UserAuth,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let projects = ProjectRepository::new(state.pool.clone())
        .list(query.client_id, query.status)
        .await?;
    Ok(Json(projects.into_iter().map(Into::into).collect()))
}

/// GET /api/projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    _user: UserAuth,
    Path(id): Path<i64>,
) -> Result<Json<Project>, ApiError> {
    ProjectRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .map(|p| Json(p.into()))
        .ok_or_else(|| not_found(id))
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    user: UserAuth,
    Json(request): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    request.validate()?;
    request.validate_date_order().map_err(ApiError::Validation)?;

    let fields = ProjectFields {
        name: None,
        client_id: request.client_id,
        description: request.description.clone(),
        status: Some(request.status),
        start_date: request.start_date.as_deref().and_then(parse_date),
        end_date: request.end_date.as_deref().and_then(parse_date),
    };

    let project: Project = ProjectRepository::new(state.pool.clone())
        .create(request.name.trim(), &fields, user.user_id, Utc::now())
        .await?
        .into();

    Ok((
        StatusCode::CREATED,
        success("Project created", json!({ "project": project })),
    ))
}

/// PUT /api/projects/:id
pub async fn update_project(
    State(state): State<AppState>,
    _user: UserAuth,
    Path(id): Path<i64>,
    Json(request): Json<UpdateProjectRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate()?;

    let repo = ProjectRepository::new(state.pool.clone());
    let current = repo.find_by_id(id).await?.ok_or_else(|| not_found(id))?;

    let start_date = request.start_date.as_deref().and_then(parse_date);
    let end_date = request.end_date.as_deref().and_then(parse_date);
    if let (Some(start), Some(end)) = (start_date.or(current.start_date), end_date.or(current.end_date)) {
        if end < start {
            return Err(ApiError::Validation(
                "End date must not be before start date".to_string(),
            ));
        }
    }

    let fields = ProjectFields {
        name: request.name.as_deref().map(|n| n.trim().to_string()),
        client_id: request.client_id,
        description: request.description.clone(),
        status: request.status,
        start_date,
        end_date,
    };

    let project: Project = repo
        .update(id, &fields, Utc::now())
        .await?
        .ok_or_else(|| not_found(id))?
        .into();

    Ok(success("Project updated", json!({ "project": project })))
}

/// DELETE /api/projects/:id
///
/// Tasks in the project keep existing and lose the link.
pub async fn delete_project(
    State(state): State<AppState>,
    _user: UserAuth,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !ProjectRepository::new(state.pool.clone()).delete(id).await? {
        return Err(not_found(id));
    }
    Ok(success("Project deleted", Value::Null))
}

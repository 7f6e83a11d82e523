//! Task routes.
//!
//! Side effects on the calendar and the reminder schedule are best effort:
//! the task change is saved even when they fail.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDateTime, NaiveTime, Utc};
use domain::models::task::{
    CreateTaskRequest, ListTasksQuery, Task, TaskDetail, TaskStatus, UpdateTaskRequest,
    UpdateTaskStatusRequest,
};
use persistence::repositories::{TaskChanges, TaskFilter, TaskRepository};
use serde_json::{json, Value};
use shared::pagination::{PageParams, Paginated};
use shared::validation::{parse_date, parse_due_date};
use tracing::{info, warn};
use validator::Validate;

use super::success;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Task {} not found", id))
}

fn parse_bound(
    value: Option<&str>,
    field: &str,
    time: NaiveTime,
) -> Result<Option<NaiveDateTime>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => parse_date(raw)
            .map(|d| Some(d.and_time(time)))
            .ok_or_else(|| ApiError::Validation(format!("{} must be YYYY-MM-DD", field))),
        None => Ok(None),
    }
}

/// GET /api/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    _user: UserAuth,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Paginated<TaskDetail>>, ApiError> {
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    let filter = TaskFilter {
        status: query.status,
        assignee_id: query.assignee_id,
        client_id: query.client_id,
        project_id: query.project_id,
        due_from: parse_bound(query.due_from.as_deref(), "due_from", NaiveTime::MIN)?,
        due_to: parse_bound(query.due_to.as_deref(), "due_to", end_of_day)?,
    };
    let params = PageParams {
        page: query.page,
        per_page: query.per_page,
    };

    let repo = TaskRepository::new(state.pool.clone());
    let tasks = repo.list(&filter, params.limit(), params.offset()).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(Paginated::new(
        tasks.into_iter().map(Into::into).collect(),
        total,
        &params,
    )))
}

/// GET /api/tasks/:id
pub async fn get_task(
    State(state): State<AppState>,
    _user: UserAuth,
    Path(id): Path<i64>,
) -> Result<Json<TaskDetail>, ApiError> {
    TaskRepository::new(state.pool.clone())
        .find_detail(id)
        .await?
        .map(|t| Json(t.into()))
        .ok_or_else(|| not_found(id))
}

async fn schedule_reminder(state: &AppState, task: &Task) {
    if let Err(e) = state.notifications().schedule_task_reminder(task, Utc::now()).await {
        warn!(task_id = task.id, error = %e, "Could not schedule task reminder");
    }
}

/// POST /api/tasks
///
/// A due date schedules a reminder for the recipient.
pub async fn create_task(
    State(state): State<AppState>,
    user: UserAuth,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    request.validate()?;

    let task: Task = TaskRepository::new(state.pool.clone())
        .insert(&request.into_new_task(user.user_id), Utc::now())
        .await?
        .into();

    info!(task_id = task.id, user_id = user.user_id, "Task created");
    if task.due_date.is_some() {
        schedule_reminder(&state, &task).await;
    }

    Ok((
        StatusCode::CREATED,
        success("Task created", json!({ "task": task })),
    ))
}

/// PUT /api/tasks/:id
///
/// Moving the due date replaces any pending reminder.
pub async fn update_task(
    State(state): State<AppState>,
    _user: UserAuth,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate()?;

    let due_date = request.due_date.as_deref().and_then(parse_due_date);
    let changes = TaskChanges {
        title: request.title.as_deref().map(|t| t.trim().to_string()),
        description: request.description.clone(),
        client_id: request.client_id,
        project_id: request.project_id,
        assignee_id: request.assignee_id,
        priority: request.priority,
        task_type: request.task_type,
        due_date,
        progress: request.progress,
    };

    let now = Utc::now();
    let task: Task = TaskRepository::new(state.pool.clone())
        .update(id, &changes, now)
        .await?
        .ok_or_else(|| not_found(id))?
        .into();

    if due_date.is_some() && !task.is_completed() {
        let notifications = state.notifications();
        match notifications.cancel_task_reminders(task.id, now).await {
            Ok(_) => schedule_reminder(&state, &task).await,
            Err(e) => warn!(task_id = task.id, error = %e, "Could not replace task reminder"),
        }
    }

    Ok(success("Task updated", json!({ "task": task })))
}

/// PUT /api/tasks/:id/status
///
/// Completing a task marks its calendar event done and drops pending
/// reminders.
pub async fn update_task_status(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTaskStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let now = Utc::now();
    let task: Task = TaskRepository::new(state.pool.clone())
        .update_status(id, request.status, now)
        .await?
        .ok_or_else(|| not_found(id))?
        .into();

    info!(task_id = id, status = %request.status, user_id = user.user_id, "Task status updated");

    if request.status == TaskStatus::Completed {
        if let Err(e) = state
            .calendar_sync()
            .update_calendar_on_task_complete(user.user_id, &task)
            .await
        {
            warn!(task_id = id, error = %e, "Calendar event not marked completed");
        }
        if let Err(e) = state.notifications().cancel_task_reminders(id, now).await {
            warn!(task_id = id, error = %e, "Pending reminders not cancelled");
        }
    }

    Ok(success("Task status updated", json!({ "task": task })))
}

/// DELETE /api/tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !TaskRepository::new(state.pool.clone()).delete(id).await? {
        return Err(not_found(id));
    }
    info!(task_id = id, user_id = user.user_id, "Task deleted");
    Ok(success("Task deleted", Value::Null))
}

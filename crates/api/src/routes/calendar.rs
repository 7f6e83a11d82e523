//! Calendar routes: pass-through event operations and task sync.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::calendar::{
    CalendarEvent, EventPayload, FreeBusyRequest, FreeBusyResponse, ImportEventRequest,
    ListEventsQuery, QuickAddRequest, SyncReport,
};
use serde_json::{json, Value};

use super::success;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

/// GET /api/calendar/events
pub async fn list_events(
    State(state): State<AppState>,
    user: UserAuth,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<Vec<CalendarEvent>>, ApiError> {
    let calendar = state.google.calendar(user.user_id).await?;
    Ok(Json(calendar.list_events(&query).await?))
}

/// GET /api/calendar/events/:event_id
pub async fn get_event(
    State(state): State<AppState>,
    user: UserAuth,
    Path(event_id): Path<String>,
) -> Result<Json<CalendarEvent>, ApiError> {
    let calendar = state.google.calendar(user.user_id).await?;
    Ok(Json(calendar.get_event(&event_id).await?))
}

/// POST /api/calendar/events
pub async fn create_event(
    State(state): State<AppState>,
    user: UserAuth,
    Json(payload): Json<EventPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if payload.summary.as_deref().map_or(true, |s| s.trim().is_empty()) {
        return Err(ApiError::Validation("Event summary is required".into()));
    }
    if payload.start.is_none() || payload.end.is_none() {
        return Err(ApiError::Validation("Event start and end are required".into()));
    }

    let calendar = state.google.calendar(user.user_id).await?;
    let event = calendar.insert_event(&payload).await?;
    Ok((
        StatusCode::CREATED,
        success("Event created", json!({ "event": event })),
    ))
}

/// PUT /api/calendar/events/:event_id
///
/// Only the fields present in the body change.
pub async fn update_event(
    State(state): State<AppState>,
    user: UserAuth,
    Path(event_id): Path<String>,
    Json(payload): Json<EventPayload>,
) -> Result<Json<Value>, ApiError> {
    let calendar = state.google.calendar(user.user_id).await?;
    let event = calendar.patch_event(&event_id, &payload).await?;
    Ok(success("Event updated", json!({ "event": event })))
}

/// DELETE /api/calendar/events/:event_id
pub async fn delete_event(
    State(state): State<AppState>,
    user: UserAuth,
    Path(event_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let calendar = state.google.calendar(user.user_id).await?;
    calendar.delete_event(&event_id).await?;
    Ok(success("Event deleted", Value::Null))
}

/// POST /api/calendar/events/quick-add
pub async fn quick_add(
    State(state): State<AppState>,
    user: UserAuth,
    Json(request): Json<QuickAddRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let calendar = state.google.calendar(user.user_id).await?;
    let event = calendar.quick_add(&request.text).await?;
    Ok((
        StatusCode::CREATED,
        success("Event created", json!({ "event": event })),
    ))
}

/// POST /api/calendar/free-busy
pub async fn free_busy(
    State(state): State<AppState>,
    user: UserAuth,
    Json(request): Json<FreeBusyRequest>,
) -> Result<Json<FreeBusyResponse>, ApiError> {
    let calendar = state.google.calendar(user.user_id).await?;
    let response = calendar
        .free_busy(
            &request.time_min,
            &request.time_max,
            &state.config.google.time_zone,
            &request.calendar_ids,
        )
        .await?;
    Ok(Json(response))
}

/// POST /api/calendar/sync-task/:task_id
pub async fn sync_task(
    State(state): State<AppState>,
    user: UserAuth,
    Path(task_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let event = state
        .calendar_sync()
        .sync_task_to_calendar(user.user_id, task_id, Utc::now())
        .await?;
    Ok(success("Task synced to calendar", json!({ "event": event })))
}

/// POST /api/calendar/import-event
pub async fn import_event(
    State(state): State<AppState>,
    user: UserAuth,
    Json(request): Json<ImportEventRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let task = state
        .calendar_sync()
        .create_task_from_event(user.user_id, &request.event_id, Utc::now())
        .await?;
    Ok((
        StatusCode::CREATED,
        success("Task created from event", json!({ "task": task })),
    ))
}

/// POST /api/calendar/full-sync
pub async fn full_sync(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<Value>, ApiError> {
    let report: SyncReport = state
        .calendar_sync()
        .full_sync(user.user_id, Utc::now())
        .await?;
    Ok(success(
        format!(
            "{} synced to calendar, {} imported",
            report.synced_to_calendar, report.synced_from_calendar
        ),
        json!({ "report": report }),
    ))
}

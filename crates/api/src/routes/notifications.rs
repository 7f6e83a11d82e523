//! Notification routes: in-app list, settings and delivery triggers.
//!
//! The trigger endpoints are meant for an external scheduler and require an
//! admin session.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use domain::models::notification::{
    ListNotificationsQuery, NotificationLog, NotificationSettings,
    UpdateNotificationSettingsRequest,
};
use persistence::repositories::UserRepository;
use serde_json::{json, Value};
use tracing::{info, warn};
use validator::Validate;

use super::success;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::services::notification::DeliveryOutcome;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 200;

fn require_admin(user: &UserAuth) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("Admin role required".to_string()))
    }
}

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    user: UserAuth,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<NotificationLog>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let notifications = state
        .notifications()
        .list_for_user(user.user_id, query.unread_only.unwrap_or(false), limit)
        .await?;
    Ok(Json(notifications))
}

/// POST /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.notifications().mark_read(user.user_id, id).await?;
    Ok(success("Notification marked as read", Value::Null))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<Value>, ApiError> {
    let updated = state.notifications().mark_all_read(user.user_id).await?;
    Ok(success(
        format!("{} notifications marked as read", updated),
        json!({ "updated": updated }),
    ))
}

/// GET /api/notifications/settings
pub async fn get_settings(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<NotificationSettings>, ApiError> {
    Ok(Json(state.notifications().settings(user.user_id).await?))
}

/// PUT /api/notifications/settings
pub async fn update_settings(
    State(state): State<AppState>,
    user: UserAuth,
    Json(request): Json<UpdateNotificationSettingsRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate()?;
    let settings = state
        .notifications()
        .update_settings(user.user_id, &request, Utc::now())
        .await?;
    Ok(success("Settings saved", json!({ "settings": settings })))
}

/// POST /api/notifications/check-overdue
pub async fn check_overdue(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<Value>, ApiError> {
    require_admin(&user)?;
    let report = state.notifications().notify_overdue_tasks(Utc::now()).await?;
    Ok(success(
        format!("{} overdue notices sent", report.notified),
        json!({ "report": report }),
    ))
}

/// POST /api/notifications/process-scheduled
pub async fn process_scheduled(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<Value>, ApiError> {
    require_admin(&user)?;
    let report = state
        .notifications()
        .process_scheduled_notifications(Utc::now())
        .await?;
    Ok(success(
        format!("{} scheduled notifications processed", report.processed),
        json!({ "report": report }),
    ))
}

/// POST /api/notifications/daily-summary
///
/// Sends today's summary to every user; one user's failure does not stop
/// the others.
pub async fn daily_summary(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<Value>, ApiError> {
    require_admin(&user)?;
    let service = state.notifications();
    let now = Utc::now();

    let (mut sent, mut skipped, mut failed) = (0usize, 0usize, 0usize);
    for recipient in UserRepository::new(state.pool.clone()).list().await? {
        match service.send_daily_summary(recipient.id, now).await {
            Ok(DeliveryOutcome::Sent) => sent += 1,
            Ok(DeliveryOutcome::Skipped(_)) => skipped += 1,
            Ok(DeliveryOutcome::Failed(_)) => failed += 1,
            Err(e) => {
                warn!(user_id = recipient.id, error = %e, "Daily summary failed");
                failed += 1;
            }
        }
    }

    info!(sent, skipped, failed, "Daily summaries processed");
    Ok(success(
        format!("{} daily summaries sent", sent),
        json!({ "report": { "sent": sent, "skipped": skipped, "failed": failed } }),
    ))
}

/// POST /api/notifications/tasks/:id/remind
pub async fn remind_task(
    State(state): State<AppState>,
    _user: UserAuth,
    Path(task_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    match state
        .notifications()
        .send_task_reminder(task_id, Utc::now())
        .await?
    {
        DeliveryOutcome::Sent => Ok(success("Reminder sent", json!({ "sent": true }))),
        DeliveryOutcome::Skipped("task not found") => {
            Err(ApiError::NotFound(format!("Task {} not found", task_id)))
        }
        DeliveryOutcome::Skipped(reason) => Ok(success(
            format!("Reminder not sent: {}", reason),
            json!({ "sent": false, "reason": reason }),
        )),
        DeliveryOutcome::Failed(error) => Err(ApiError::Provider(error)),
    }
}

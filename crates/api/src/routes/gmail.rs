//! Gmail routes: mailbox pass-through and mail-to-task import.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::gmail::{
    EmailMessage, ListMessagesQuery, MessageList, ModifyLabelsRequest, SendEmailRequest,
};
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use super::success;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::services::google::gmail::flatten_message;

/// GET /api/gmail/messages
pub async fn list_messages(
    State(state): State<AppState>,
    user: UserAuth,
    Query(query): Query<ListMessagesQuery>,
) -> Result<Json<MessageList>, ApiError> {
    let gmail = state.google.gmail(user.user_id).await?;
    Ok(Json(gmail.list_messages(&query).await?))
}

/// GET /api/gmail/messages/:id
pub async fn get_message(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<String>,
) -> Result<Json<EmailMessage>, ApiError> {
    let gmail = state.google.gmail(user.user_id).await?;
    Ok(Json(flatten_message(&gmail.get_message(&id).await?)))
}

/// POST /api/gmail/send
pub async fn send_message(
    State(state): State<AppState>,
    user: UserAuth,
    Json(request): Json<SendEmailRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate()?;
    let gmail = state.google.gmail(user.user_id).await?;
    let sent = gmail.send(&request).await?;
    info!(user_id = user.user_id, message_id = %sent.id, "Mail sent");
    Ok(success("Message sent", json!({ "message_id": sent.id })))
}

/// POST /api/gmail/messages/:id/modify
pub async fn modify_labels(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<String>,
    Json(request): Json<ModifyLabelsRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.add_label_ids.is_empty() && request.remove_label_ids.is_empty() {
        return Err(ApiError::Validation("No label changes given".into()));
    }
    let gmail = state.google.gmail(user.user_id).await?;
    let message = gmail.modify_labels(&id, &request).await?;
    Ok(success("Labels updated", json!({ "message_id": message.id })))
}

/// POST /api/gmail/messages/:id/trash
pub async fn trash_message(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let gmail = state.google.gmail(user.user_id).await?;
    gmail.trash(&id).await?;
    Ok(success("Message moved to trash", Value::Null))
}

/// POST /api/gmail/messages/:id/to-task
pub async fn message_to_task(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let task = state
        .mail_import()
        .message_to_task(user.user_id, &id, Utc::now())
        .await?;
    Ok((
        StatusCode::CREATED,
        success("Task created from email", json!({ "task": task })),
    ))
}

/// POST /api/gmail/process-client-emails
pub async fn process_client_emails(
    State(state): State<AppState>,
    user: UserAuth,
) -> Result<Json<Value>, ApiError> {
    let report = state
        .mail_import()
        .process_client_emails(user.user_id, Utc::now())
        .await?;
    Ok(success(
        format!("{} tasks created from client mail", report.tasks_created),
        json!({ "report": report }),
    ))
}

//! Drive routes: file pass-through, client folders and task attachments.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use domain::models::drive::{
    CreateFolderRequest, DriveFile, FileList, ListFilesQuery, MoveFileRequest, RenameFileRequest,
    ShareFileRequest, TaskAttachment, UploadFileRequest,
};
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use super::success;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::services::drive::decode_content;

/// Largest page a caller may ask for.
const MAX_PAGE_SIZE: u32 = 100;

/// GET /api/drive/files
pub async fn list_files(
    State(state): State<AppState>,
    user: UserAuth,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<FileList>, ApiError> {
    let service = state.drive();
    let folder = query
        .folder_id
        .clone()
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| service.root_folder_id().to_string());
    let page_size = query.page_size.unwrap_or(50).clamp(1, MAX_PAGE_SIZE);

    let drive = state.google.drive(user.user_id).await?;
    let files = drive
        .list_files(&folder, query.q.as_deref(), Some(page_size))
        .await?;
    Ok(Json(files))
}

/// GET /api/drive/files/:file_id
pub async fn get_file(
    State(state): State<AppState>,
    user: UserAuth,
    Path(file_id): Path<String>,
) -> Result<Json<DriveFile>, ApiError> {
    let drive = state.google.drive(user.user_id).await?;
    Ok(Json(drive.get_file(&file_id).await?))
}

/// POST /api/drive/files
pub async fn upload_file(
    State(state): State<AppState>,
    user: UserAuth,
    Json(request): Json<UploadFileRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    request.validate()?;
    let content = decode_content(&request.content)?;
    let parent = request
        .parent_id
        .clone()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| state.drive().root_folder_id().to_string());

    let drive = state.google.drive(user.user_id).await?;
    let file = drive
        .upload(&request.name, &request.mime_type, &parent, &content)
        .await?;
    info!(user_id = user.user_id, file_id = %file.id, "File uploaded");
    Ok((
        StatusCode::CREATED,
        success("File uploaded", json!({ "file": file })),
    ))
}

/// POST /api/drive/folders
pub async fn create_folder(
    State(state): State<AppState>,
    user: UserAuth,
    Json(request): Json<CreateFolderRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    request.validate()?;
    let parent = request
        .parent_id
        .clone()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| state.drive().root_folder_id().to_string());

    let drive = state.google.drive(user.user_id).await?;
    let folder = drive.create_folder(request.name.trim(), &parent).await?;
    Ok((
        StatusCode::CREATED,
        success("Folder created", json!({ "folder": folder })),
    ))
}

/// DELETE /api/drive/files/:file_id
pub async fn delete_file(
    State(state): State<AppState>,
    user: UserAuth,
    Path(file_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let drive = state.google.drive(user.user_id).await?;
    drive.delete(&file_id).await?;
    Ok(success("File deleted", Value::Null))
}

/// POST /api/drive/files/:file_id/move
pub async fn move_file(
    State(state): State<AppState>,
    user: UserAuth,
    Path(file_id): Path<String>,
    Json(request): Json<MoveFileRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.new_parent_id.trim().is_empty() {
        return Err(ApiError::Validation("new_parent_id is required".into()));
    }
    let drive = state.google.drive(user.user_id).await?;
    let file = drive.move_file(&file_id, &request.new_parent_id).await?;
    Ok(success("File moved", json!({ "file": file })))
}

/// POST /api/drive/files/:file_id/rename
pub async fn rename_file(
    State(state): State<AppState>,
    user: UserAuth,
    Path(file_id): Path<String>,
    Json(request): Json<RenameFileRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate()?;
    let drive = state.google.drive(user.user_id).await?;
    let file = drive.rename(&file_id, request.name.trim()).await?;
    Ok(success("File renamed", json!({ "file": file })))
}

/// POST /api/drive/files/:file_id/share
pub async fn share_file(
    State(state): State<AppState>,
    user: UserAuth,
    Path(file_id): Path<String>,
    Json(request): Json<ShareFileRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate()?;
    let drive = state.google.drive(user.user_id).await?;
    let permission = drive.share(&file_id, &request.email, &request.role).await?;
    Ok(success("File shared", json!({ "permission": permission })))
}

/// GET /api/drive/files/:file_id/download
pub async fn download_file(
    State(state): State<AppState>,
    user: UserAuth,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    let drive = state.google.drive(user.user_id).await?;
    let metadata = drive.get_file(&file_id).await?;
    let content = drive.download(&file_id).await?;

    let content_type = if metadata.mime_type.is_empty() {
        "application/octet-stream".to_string()
    } else {
        metadata.mime_type.clone()
    };
    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        utf8_percent_encode(&metadata.name)
    );

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(content),
    )
        .into_response())
}

/// RFC 5987 value encoding for the download file name.
fn utf8_percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// POST /api/clients/:id/drive-folders
pub async fn provision_client_folders(
    State(state): State<AppState>,
    user: UserAuth,
    Path(client_id): Path<i64>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let folders = state
        .drive()
        .provision_client_folders(user.user_id, client_id, Utc::now())
        .await?;

    let (status, message) = if folders.created {
        (StatusCode::CREATED, "Client folders created")
    } else {
        (StatusCode::OK, "Client folder already exists")
    };
    Ok((status, success(message, json!({ "folders": folders }))))
}

/// GET /api/tasks/:id/attachments
pub async fn list_attachments(
    State(state): State<AppState>,
    _user: UserAuth,
    Path(task_id): Path<i64>,
) -> Result<Json<Vec<TaskAttachment>>, ApiError> {
    Ok(Json(state.drive().list_attachments(task_id).await?))
}

/// POST /api/tasks/:id/attachments
pub async fn upload_attachment(
    State(state): State<AppState>,
    user: UserAuth,
    Path(task_id): Path<i64>,
    Json(request): Json<UploadFileRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    request.validate()?;
    let attachment = state
        .drive()
        .attach_to_task(user.user_id, task_id, &request, Utc::now())
        .await?;
    Ok((
        StatusCode::CREATED,
        success("File attached", json!({ "attachment": attachment })),
    ))
}

/// DELETE /api/tasks/:id/attachments/:attachment_id
pub async fn delete_attachment(
    State(state): State<AppState>,
    user: UserAuth,
    Path((task_id, attachment_id)): Path<(i64, i64)>,
) -> Result<Json<Value>, ApiError> {
    state
        .drive()
        .delete_attachment(user.user_id, task_id, attachment_id)
        .await?;
    Ok(success("Attachment deleted", Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_percent_encode() {
        assert_eq!(utf8_percent_encode("report-1.pdf"), "report-1.pdf");
        assert_eq!(utf8_percent_encode("a b"), "a%20b");
        assert_eq!(utf8_percent_encode("契"), "%E5%A5%91");
    }
}

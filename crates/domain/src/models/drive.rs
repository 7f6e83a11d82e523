//! External file-storage records and task attachments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// MIME type the provider uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Subfolders created under every client folder, in display order.
pub const CLIENT_SUBFOLDERS: [&str; 6] = [
    "01_契約書",
    "02_労務管理",
    "03_給与計算",
    "04_社会保険",
    "05_助成金",
    "06_その他",
];

/// Name of a client's root folder.
pub fn client_folder_name(client_id: i64, client_name: &str) -> String {
    format!("{:04}_{}", client_id, client_name.trim())
}

/// A file or folder as returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub parents: Vec<String>,
    /// The provider reports sizes as decimal strings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// One page of a file listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Permission grant returned by a share call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, rename = "type")]
    pub grantee_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

/// A client's provisioned folder tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ClientFolders {
    pub client_id: i64,
    pub root_folder_id: String,
    /// Empty when the folder already existed and nothing was created.
    pub subfolders: Vec<DriveFile>,
    pub created: bool,
}

/// A stored file linked to a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskAttachment {
    pub id: i64,
    pub task_id: i64,
    pub file_id: String,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    pub web_view_link: Option<String>,
    pub uploaded_by: i64,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for listing files.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListFilesQuery {
    /// Folder to list; the configured root when absent.
    pub folder_id: Option<String>,
    pub q: Option<String>,
    pub page_size: Option<u32>,
}

/// Request payload for uploading a file. `content` is base64.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UploadFileRequest {
    #[validate(length(min = 1, max = 255, message = "File name must be 1-255 characters"))]
    pub name: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    #[validate(length(min = 1, message = "File content is required"))]
    pub content: String,
    pub parent_id: Option<String>,
}

fn default_mime_type() -> String {
    "application/octet-stream".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateFolderRequest {
    #[validate(length(min = 1, max = 255, message = "Folder name must be 1-255 characters"))]
    pub name: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MoveFileRequest {
    pub new_parent_id: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RenameFileRequest {
    #[validate(length(min = 1, max = 255, message = "File name must be 1-255 characters"))]
    pub name: String,
}

fn default_share_role() -> String {
    "reader".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ShareFileRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    /// `reader`, `commenter` or `writer`.
    #[serde(default = "default_share_role")]
    #[validate(custom(function = "validate_share_role"))]
    pub role: String,
}

fn validate_share_role(role: &str) -> Result<(), validator::ValidationError> {
    match role {
        "reader" | "commenter" | "writer" => Ok(()),
        _ => {
            let mut err = validator::ValidationError::new("share_role");
            err.message = Some("Role must be reader, commenter or writer".into());
            Err(err)
        }
    }
}

//! Drive API: files, folders, permissions and content.

use domain::models::drive::{DriveFile, FileList, Permission, FOLDER_MIME_TYPE};
use reqwest::Method;
use serde_json::json;

use super::{endpoint, GoogleApiError, Session};

/// Fields requested for every file resource.
const FILE_FIELDS: &str = "id,name,mimeType,parents,size,webViewLink,createdTime,modifiedTime";
pub const MAX_PAGE_SIZE: u32 = 100;

pub struct DriveApi {
    session: Session,
    base_url: String,
    upload_url: String,
}

/// Escapes a value for use inside a quoted Drive query string.
pub fn quote_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

impl DriveApi {
    pub(crate) fn new(session: Session, base_url: &str, upload_url: &str) -> Self {
        Self {
            session,
            base_url: base_url.to_string(),
            upload_url: upload_url.to_string(),
        }
    }

    fn file_url(&self, extra: &[&str]) -> Result<reqwest::Url, GoogleApiError> {
        let mut segments = vec!["files"];
        segments.extend_from_slice(extra);
        endpoint(&self.base_url, &segments)
    }

    /// Non-trashed children of `folder_id`, optionally filtered by name.
    pub async fn list_files(
        &self,
        folder_id: &str,
        name_contains: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<FileList, GoogleApiError> {
        let mut q = format!(
            "'{}' in parents and trashed = false",
            quote_query_value(folder_id)
        );
        if let Some(name) = name_contains.filter(|n| !n.trim().is_empty()) {
            q.push_str(&format!(" and name contains '{}'", quote_query_value(name)));
        }

        let fields = format!("nextPageToken,files({})", FILE_FIELDS);
        let size = page_size.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE).to_string();
        let request = self
            .session
            .request(Method::GET, self.file_url(&[])?)
            .query(&[
                ("q", q.as_str()),
                ("fields", fields.as_str()),
                ("pageSize", size.as_str()),
                ("orderBy", "folder,name"),
            ]);
        self.session.json(request).await
    }

    pub async fn get_file(&self, file_id: &str) -> Result<DriveFile, GoogleApiError> {
        let request = self
            .session
            .request(Method::GET, self.file_url(&[file_id])?)
            .query(&[("fields", FILE_FIELDS)]);
        self.session.json(request).await
    }

    /// Multipart upload of metadata plus content.
    pub async fn upload(
        &self,
        name: &str,
        mime_type: &str,
        parent_id: &str,
        content: &[u8],
    ) -> Result<DriveFile, GoogleApiError> {
        let metadata = json!({ "name": name, "parents": [parent_id] });
        let boundary = format!("drive_{}", uuid::Uuid::new_v4().simple());

        let mut body = Vec::with_capacity(content.len() + 512);
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: {t}\r\n\r\n",
                b = boundary,
                m = metadata,
                t = mime_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let url = endpoint(&self.upload_url, &["files"])?;
        let request = self
            .session
            .request(Method::POST, url)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body);
        self.session.json(request).await
    }

    pub async fn create_folder(&self, name: &str, parent_id: &str) -> Result<DriveFile, GoogleApiError> {
        let body = json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent_id],
        });
        let request = self
            .session
            .request(Method::POST, self.file_url(&[])?)
            .query(&[("fields", FILE_FIELDS)])
            .json(&body);
        self.session.json(request).await
    }

    pub async fn delete(&self, file_id: &str) -> Result<(), GoogleApiError> {
        let request = self
            .session
            .request(Method::DELETE, self.file_url(&[file_id])?);
        self.session.empty(request).await
    }

    /// Moves a file under `new_parent_id`, detaching it from its current parents.
    pub async fn move_file(&self, file_id: &str, new_parent_id: &str) -> Result<DriveFile, GoogleApiError> {
        let current = self.get_file(file_id).await?;
        let previous = current.parents.join(",");

        let request = self
            .session
            .request(Method::PATCH, self.file_url(&[file_id])?)
            .query(&[
                ("addParents", new_parent_id),
                ("removeParents", previous.as_str()),
                ("fields", FILE_FIELDS),
            ])
            .json(&json!({}));
        self.session.json(request).await
    }

    pub async fn rename(&self, file_id: &str, name: &str) -> Result<DriveFile, GoogleApiError> {
        let request = self
            .session
            .request(Method::PATCH, self.file_url(&[file_id])?)
            .query(&[("fields", FILE_FIELDS)])
            .json(&json!({ "name": name }));
        self.session.json(request).await
    }

    /// Grants `role` on the file to a single user.
    pub async fn share(&self, file_id: &str, email: &str, role: &str) -> Result<Permission, GoogleApiError> {
        let body = json!({
            "type": "user",
            "role": role,
            "emailAddress": email,
        });
        let request = self
            .session
            .request(Method::POST, self.file_url(&[file_id, "permissions"])?)
            .query(&[("sendNotificationEmail", "true")])
            .json(&body);
        self.session.json(request).await
    }

    /// Raw file content.
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>, GoogleApiError> {
        let request = self
            .session
            .request(Method::GET, self.file_url(&[file_id])?)
            .query(&[("alt", "media")]);
        self.session.bytes(request).await
    }
}

//! Client folder provisioning and task attachments on Drive.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use domain::models::drive::{
    client_folder_name, ClientFolders, DriveFile, TaskAttachment, UploadFileRequest,
    CLIENT_SUBFOLDERS,
};
use persistence::repositories::{ClientRepository, NewAttachment, TaskAttachmentRepository, TaskRepository};
use persistence::SqlitePool;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::services::google::GoogleClient;

/// Parent used when no root folder is configured.
const DRIVE_ROOT: &str = "root";

/// Decodes base64 upload content.
pub fn decode_content(content: &str) -> Result<Vec<u8>, ApiError> {
    STANDARD
        .decode(content.trim())
        .map_err(|_| ApiError::Validation("File content must be base64 encoded".into()))
}

#[derive(Clone)]
pub struct DriveService {
    clients: ClientRepository,
    tasks: TaskRepository,
    attachments: TaskAttachmentRepository,
    google: GoogleClient,
}

impl DriveService {
    pub fn new(pool: SqlitePool, google: GoogleClient) -> Self {
        Self {
            clients: ClientRepository::new(pool.clone()),
            tasks: TaskRepository::new(pool.clone()),
            attachments: TaskAttachmentRepository::new(pool),
            google,
        }
    }

    /// Folder all client folders live under.
    pub fn root_folder_id(&self) -> &str {
        let configured = self.google.config().drive_root_folder_id.as_str();
        if configured.is_empty() {
            DRIVE_ROOT
        } else {
            configured
        }
    }

    /// Creates the client's folder and its standard subfolders.
    ///
    /// A client that already has a folder is returned as is.
    pub async fn provision_client_folders(
        &self,
        user_id: i64,
        client_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ClientFolders, ApiError> {
        let client = self
            .clients
            .find_by_id(client_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Client {} not found", client_id)))?;

        if let Some(folder_id) = client.drive_folder_id.filter(|id| !id.is_empty()) {
            return Ok(ClientFolders {
                client_id,
                root_folder_id: folder_id,
                subfolders: Vec::new(),
                created: false,
            });
        }

        let drive = self.google.drive(user_id).await?;
        let root = drive
            .create_folder(&client_folder_name(client.id, &client.name), self.root_folder_id())
            .await?;

        let mut subfolders = Vec::with_capacity(CLIENT_SUBFOLDERS.len());
        for name in CLIENT_SUBFOLDERS {
            subfolders.push(drive.create_folder(name, &root.id).await?);
        }

        self.clients.set_drive_folder(client_id, &root.id, now).await?;
        info!(client_id, folder_id = %root.id, "Client folders provisioned");

        Ok(ClientFolders {
            client_id,
            root_folder_id: root.id,
            subfolders,
            created: true,
        })
    }

    /// Uploads a file and links it to the task.
    ///
    /// Without an explicit parent the file goes to the task client's folder,
    /// or the root folder when the client has none.
    pub async fn attach_to_task(
        &self,
        user_id: i64,
        task_id: i64,
        request: &UploadFileRequest,
        now: DateTime<Utc>,
    ) -> Result<TaskAttachment, ApiError> {
        let task = self
            .tasks
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", task_id)))?;
        let content = decode_content(&request.content)?;

        let parent = match request.parent_id.clone().filter(|p| !p.is_empty()) {
            Some(parent) => parent,
            None => self.client_folder(task.client_id).await?,
        };

        let drive = self.google.drive(user_id).await?;
        let file = drive
            .upload(&request.name, &request.mime_type, &parent, &content)
            .await?;

        let stored = self
            .attachments
            .insert(
                &NewAttachment {
                    task_id,
                    file_id: &file.id,
                    file_name: &file.name,
                    mime_type: Some(file.mime_type.as_str()).filter(|m| !m.is_empty()),
                    file_size: file_size(&file).or(Some(content.len() as i64)),
                    web_view_link: file.web_view_link.as_deref(),
                    uploaded_by: user_id,
                },
                now,
            )
            .await;

        match stored {
            Ok(attachment) => {
                info!(task_id, file_id = %file.id, "File attached to task");
                Ok(attachment.into())
            }
            Err(e) => {
                if let Err(cleanup) = drive.delete(&file.id).await {
                    warn!(task_id, file_id = %file.id, error = %cleanup, "Uploaded file left unlinked");
                }
                Err(e.into())
            }
        }
    }

    async fn client_folder(&self, client_id: Option<i64>) -> Result<String, ApiError> {
        let folder = match client_id {
            Some(id) => self
                .clients
                .find_by_id(id)
                .await?
                .and_then(|c| c.drive_folder_id)
                .filter(|f| !f.is_empty()),
            None => None,
        };
        Ok(folder.unwrap_or_else(|| self.root_folder_id().to_string()))
    }

    pub async fn list_attachments(&self, task_id: i64) -> Result<Vec<TaskAttachment>, ApiError> {
        if self.tasks.find_by_id(task_id).await?.is_none() {
            return Err(ApiError::NotFound(format!("Task {} not found", task_id)));
        }
        let attachments = self.attachments.list_for_task(task_id).await?;
        Ok(attachments.into_iter().map(Into::into).collect())
    }

    /// Unlinks the attachment, then removes the file (best effort).
    pub async fn delete_attachment(
        &self,
        user_id: i64,
        task_id: i64,
        attachment_id: i64,
    ) -> Result<(), ApiError> {
        let attachment = self
            .attachments
            .find(task_id, attachment_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Attachment {} not found", attachment_id)))?;

        self.attachments.delete(task_id, attachment_id).await?;

        let removed = match self.google.drive(user_id).await {
            Ok(drive) => drive.delete(&attachment.file_id).await,
            Err(e) => Err(e),
        };
        if let Err(e) = removed {
            warn!(task_id, file_id = %attachment.file_id, error = %e, "Attachment file not removed");
        }
        Ok(())
    }
}

fn file_size(file: &DriveFile) -> Option<i64> {
    file.size.as_deref().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_content() {
        assert_eq!(decode_content("aGVsbG8=").unwrap(), b"hello");
        assert!(matches!(decode_content("***"), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_file_size_parses_decimal_string() {
        let file = DriveFile {
            id: "f".into(),
            size: Some("1024".into()),
            ..Default::default()
        };
        assert_eq!(file_size(&file), Some(1024));
        assert_eq!(file_size(&DriveFile::default()), None);
    }
}

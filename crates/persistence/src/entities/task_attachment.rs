//! Task attachment entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the task_attachments table.
#[derive(Debug, Clone, FromRow)]
pub struct TaskAttachmentEntity {
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

impl From<TaskAttachmentEntity> for domain::models::TaskAttachment {
    fn from(entity: TaskAttachmentEntity) -> Self {
        Self {
            id: entity.id,
            task_id: entity.task_id,
            file_id: entity.file_id,
            file_name: entity.file_name,
            mime_type: entity.mime_type,
            file_size: entity.file_size,
            web_view_link: entity.web_view_link,
            uploaded_by: entity.uploaded_by,
            created_at: entity.created_at,
        }
    }
}

//! Task attachment repository.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::entities::TaskAttachmentEntity;
use crate::metrics::QueryTimer;

const ATTACHMENT_COLUMNS: &str =
    "id, task_id, file_id, file_name, mime_type, file_size, web_view_link, uploaded_by, created_at";

/// An uploaded file to link to a task.
#[derive(Debug, Clone)]
pub struct NewAttachment<'a> {
    pub task_id: i64,
    pub file_id: &'a str,
    pub file_name: &'a str,
    pub mime_type: Option<&'a str>,
    pub file_size: Option<i64>,
    pub web_view_link: Option<&'a str>,
    pub uploaded_by: i64,
}

#[derive(Clone)]
pub struct TaskAttachmentRepository {
    pool: SqlitePool,
}

impl TaskAttachmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        attachment: &NewAttachment<'_>,
        now: DateTime<Utc>,
    ) -> Result<TaskAttachmentEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_task_attachment");
        let sql = format!(
            r#"
            INSERT INTO task_attachments (task_id, file_id, file_name, mime_type, file_size,
                                          web_view_link, uploaded_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING {ATTACHMENT_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, TaskAttachmentEntity>(&sql)
            .bind(attachment.task_id)
            .bind(attachment.file_id)
            .bind(attachment.file_name)
            .bind(attachment.mime_type)
            .bind(attachment.file_size)
            .bind(attachment.web_view_link)
            .bind(attachment.uploaded_by)
            .bind(now)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn list_for_task(&self, task_id: i64) -> Result<Vec<TaskAttachmentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_task_attachments");
        let sql = format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM task_attachments WHERE task_id = ?1 ORDER BY created_at, id"
        );
        let result = sqlx::query_as::<_, TaskAttachmentEntity>(&sql)
            .bind(task_id)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn find(
        &self,
        task_id: i64,
        id: i64,
    ) -> Result<Option<TaskAttachmentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_task_attachment");
        let sql = format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM task_attachments WHERE id = ?1 AND task_id = ?2"
        );
        let result = sqlx::query_as::<_, TaskAttachmentEntity>(&sql)
            .bind(id)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn delete(&self, task_id: i64, id: i64) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_task_attachment");
        let result = sqlx::query("DELETE FROM task_attachments WHERE id = ?1 AND task_id = ?2")
            .bind(id)
            .bind(task_id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }
}

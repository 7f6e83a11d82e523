//! Project repository for database operations.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::project::ProjectStatus;
use sqlx::SqlitePool;

use crate::entities::ProjectEntity;
use crate::metrics::QueryTimer;

const PROJECT_COLUMNS: &str =
    "id, name, client_id, description, status, start_date, end_date, created_by, created_at, updated_at";

/// Fields written when creating or updating a project.
#[derive(Debug, Clone, Default)]
pub struct ProjectFields {
    pub name: Option<String>,
    pub client_id: Option<i64>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Repository for project-related database operations.
#[derive(Clone)]
pub struct ProjectRepository {
    pool: SqlitePool,
}

impl ProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        client_id: Option<i64>,
        status: Option<ProjectStatus>,
    ) -> Result<Vec<ProjectEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_projects");
        let sql = format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE (?1 IS NULL OR client_id = ?1)
              AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC, id DESC
            "#
        );
        let result = sqlx::query_as::<_, ProjectEntity>(&sql)
            .bind(client_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<ProjectEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_project_by_id");
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1");
        let result = sqlx::query_as::<_, ProjectEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn create(
        &self,
        name: &str,
        fields: &ProjectFields,
        created_by: i64,
        now: DateTime<Utc>,
    ) -> Result<ProjectEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_project");
        let sql = format!(
            r#"
            INSERT INTO projects (name, client_id, description, status, start_date, end_date,
                                  created_by, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            RETURNING {PROJECT_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, ProjectEntity>(&sql)
            .bind(name)
            .bind(fields.client_id)
            .bind(&fields.description)
            .bind(fields.status.unwrap_or(ProjectStatus::Planning))
            .bind(fields.start_date)
            .bind(fields.end_date)
            .bind(created_by)
            .bind(now)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn update(
        &self,
        id: i64,
        fields: &ProjectFields,
        now: DateTime<Utc>,
    ) -> Result<Option<ProjectEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_project");
        let sql = format!(
            r#"
            UPDATE projects SET
                name = COALESCE(?2, name),
                client_id = COALESCE(?3, client_id),
                description = COALESCE(?4, description),
                status = COALESCE(?5, status),
                start_date = COALESCE(?6, start_date),
                end_date = COALESCE(?7, end_date),
                updated_at = ?8
            WHERE id = ?1
            RETURNING {PROJECT_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, ProjectEntity>(&sql)
            .bind(id)
            .bind(&fields.name)
            .bind(fields.client_id)
            .bind(&fields.description)
            .bind(fields.status)
            .bind(fields.start_date)
            .bind(fields.end_date)
            .bind(now)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Deletes a project; its tasks keep existing without a project.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_project");
        let result = sqlx::query("DELETE FROM projects WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }
}

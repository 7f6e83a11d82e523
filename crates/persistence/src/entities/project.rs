//! Project entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::project::ProjectStatus;
use sqlx::FromRow;

/// Database row mapping for the projects table.
#[derive(Debug, Clone, FromRow)]
pub struct ProjectEntity {
    pub id: i64,
    pub name: String,
    pub client_id: Option<i64>,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProjectEntity> for domain::models::Project {
    fn from(entity: ProjectEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            client_id: entity.client_id,
            description: entity.description,
            status: entity.status,
            start_date: entity.start_date,
            end_date: entity.end_date,
            created_by: entity.created_by,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

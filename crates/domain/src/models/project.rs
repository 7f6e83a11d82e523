//! Project domain model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Status of a client project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    Active,
    Completed,
    OnHold,
}

/// Groups related tasks for one client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Project {
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

fn default_project_status() -> ProjectStatus {
    ProjectStatus::Planning
}

/// Request payload for creating a project.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub name: String,

    pub client_id: Option<i64>,
    pub description: Option<String>,

    #[serde(default = "default_project_status")]
    pub status: ProjectStatus,

    #[validate(custom(function = "shared::validation::validate_date"))]
    pub start_date: Option<String>,

    #[validate(custom(function = "shared::validation::validate_date"))]
    pub end_date: Option<String>,
}

impl CreateProjectRequest {
    /// Checks that the end date is not before the start date.
    pub fn validate_date_order(&self) -> Result<(), String> {
        let start = self
            .start_date
            .as_deref()
            .and_then(shared::validation::parse_date);
        let end = self
            .end_date
            .as_deref()
            .and_then(shared::validation::parse_date);
        match (start, end) {
            (Some(s), Some(e)) if e < s => Err("End date must not be before start date".into()),
            _ => Ok(()),
        }
    }
}

/// Request payload for updating a project (partial update).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    pub client_id: Option<i64>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,

    #[validate(custom(function = "shared::validation::validate_date"))]
    pub start_date: Option<String>,

    #[validate(custom(function = "shared::validation::validate_date"))]
    pub end_date: Option<String>,
}

/// Query parameters for listing projects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListProjectsQuery {
    pub client_id: Option<i64>,
    pub status: Option<ProjectStatus>,
}

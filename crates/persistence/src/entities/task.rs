//! Task entity (database row mapping).

use chrono::{DateTime, NaiveDateTime, Utc};
use domain::models::task::{TaskDetail, TaskPriority, TaskStatus, TaskType};
use sqlx::FromRow;

/// Column list for task selects, qualified with the `t` alias.
pub(crate) const TASK_COLUMNS: &str = "t.id, t.title, t.description, t.client_id, t.project_id, \
     t.assignee_id, t.created_by, t.priority, t.task_type, t.status, t.progress, t.due_date, \
     t.calendar_event_id, t.gmail_message_id, t.completed_at, t.created_at, t.updated_at";

/// Unqualified column list for `RETURNING` clauses.
pub(crate) const TASK_FIELDS: &str = "id, title, description, client_id, project_id, \
     assignee_id, created_by, priority, task_type, status, progress, due_date, \
     calendar_event_id, gmail_message_id, completed_at, created_at, updated_at";

/// Database row mapping for the tasks table.
#[derive(Debug, Clone, FromRow)]
pub struct TaskEntity {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub client_id: Option<i64>,
    pub project_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub created_by: i64,
    pub priority: TaskPriority,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub progress: i64,
    pub due_date: Option<NaiveDateTime>,
    pub calendar_event_id: Option<String>,
    pub gmail_message_id: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskEntity> for domain::models::Task {
    fn from(entity: TaskEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            description: entity.description,
            client_id: entity.client_id,
            project_id: entity.project_id,
            assignee_id: entity.assignee_id,
            created_by: entity.created_by,
            priority: entity.priority,
            task_type: entity.task_type,
            status: entity.status,
            progress: entity.progress,
            due_date: entity.due_date,
            calendar_event_id: entity.calendar_event_id,
            gmail_message_id: entity.gmail_message_id,
            completed_at: entity.completed_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Task row joined with client and assignee names.
#[derive(Debug, Clone, FromRow)]
pub struct TaskDetailEntity {
    #[sqlx(flatten)]
    pub task: TaskEntity,
    pub client_name: Option<String>,
    pub assignee_name: Option<String>,
    pub assignee_email: Option<String>,
}

impl From<TaskDetailEntity> for TaskDetail {
    fn from(entity: TaskDetailEntity) -> Self {
        Self {
            task: entity.task.into(),
            client_name: entity.client_name,
            assignee_name: entity.assignee_name,
            assignee_email: entity.assignee_email,
        }
    }
}

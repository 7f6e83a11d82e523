//! Task domain model.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    OnHold,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::OnHold => write!(f, "on_hold"),
        }
    }
}

/// Task priority. Drives the calendar event color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    /// Label shown to office staff.
    pub fn label(&self) -> &'static str {
        match self {
            TaskPriority::Low => "低",
            TaskPriority::Medium => "中",
            TaskPriority::High => "高",
            TaskPriority::Urgent => "緊急",
        }
    }
}

/// Kind of office work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TaskType {
    Procedure,
    Consultation,
    Document,
    Payroll,
    Subsidy,
    Other,
}

impl TaskType {
    pub fn label(&self) -> &'static str {
        match self {
            TaskType::Procedure => "手続き",
            TaskType::Consultation => "相談",
            TaskType::Document => "書類作成",
            TaskType::Payroll => "給与計算",
            TaskType::Subsidy => "助成金",
            TaskType::Other => "その他",
        }
    }
}

/// A unit of office work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub client_id: Option<i64>,
    pub project_id: Option<i64>,
    pub assignee_id: Option<i64>,
    /// Owning user (the creator).
    pub created_by: i64,
    pub priority: TaskPriority,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub progress: i64,
    /// Local office wall-clock time.
    pub due_date: Option<NaiveDateTime>,
    pub calendar_event_id: Option<String>,
    pub gmail_message_id: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// A task joined with the display names of its client and assignee.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub client_name: Option<String>,
    pub assignee_name: Option<String>,
    pub assignee_email: Option<String>,
}

/// Fields for inserting a task, regardless of where it came from
/// (manual entry, calendar import, mail import).
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub client_id: Option<i64>,
    pub project_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub created_by: i64,
    pub priority: TaskPriority,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDateTime>,
    pub calendar_event_id: Option<String>,
    pub gmail_message_id: Option<String>,
}

fn default_priority() -> TaskPriority {
    TaskPriority::Medium
}

fn default_task_type() -> TaskType {
    TaskType::Other
}

/// Request payload for creating a task.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub title: String,

    pub description: Option<String>,
    pub client_id: Option<i64>,
    pub project_id: Option<i64>,
    pub assignee_id: Option<i64>,

    #[serde(default = "default_priority")]
    pub priority: TaskPriority,

    #[serde(default = "default_task_type")]
    pub task_type: TaskType,

    #[validate(custom(function = "shared::validation::validate_due_date"))]
    pub due_date: Option<String>,
}

impl CreateTaskRequest {
    /// Converts the validated request into insert fields owned by `user_id`.
    pub fn into_new_task(self, user_id: i64) -> NewTask {
        NewTask {
            due_date: self
                .due_date
                .as_deref()
                .and_then(shared::validation::parse_due_date),
            title: self.title.trim().to_string(),
            description: self.description,
            client_id: self.client_id,
            project_id: self.project_id,
            assignee_id: self.assignee_id,
            created_by: user_id,
            priority: self.priority,
            task_type: self.task_type,
            status: TaskStatus::Pending,
            calendar_event_id: None,
            gmail_message_id: None,
        }
    }
}

/// Request payload for updating a task (partial update).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub client_id: Option<i64>,
    pub project_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub priority: Option<TaskPriority>,
    pub task_type: Option<TaskType>,

    #[validate(custom(function = "shared::validation::validate_due_date"))]
    pub due_date: Option<String>,

    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<i64>,
}

/// Request payload for a status change.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
}

/// Query parameters for listing tasks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<i64>,
    pub client_id: Option<i64>,
    pub project_id: Option<i64>,
    /// Inclusive lower bound, `YYYY-MM-DD`.
    pub due_from: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`.
    pub due_to: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

//! Subsidy application and checklist domain models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Status of a subsidy application.
///
/// `planning → preparing → document_check → submitted → under_review →
/// {approved, rejected}`, `approved → received`, and any pre-submission
/// state may move to `cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Planning,
    Preparing,
    DocumentCheck,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Received,
    Cancelled,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 9] = [
        ApplicationStatus::Planning,
        ApplicationStatus::Preparing,
        ApplicationStatus::DocumentCheck,
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
        ApplicationStatus::Received,
        ApplicationStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Planning => "planning",
            ApplicationStatus::Preparing => "preparing",
            ApplicationStatus::DocumentCheck => "document_check",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Received => "received",
            ApplicationStatus::Cancelled => "cancelled",
        }
    }

    /// States before the application has been handed to the authority.
    pub fn is_pre_submission(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Planning
                | ApplicationStatus::Preparing
                | ApplicationStatus::DocumentCheck
        )
    }

    /// No further transitions are expected from these states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Rejected | ApplicationStatus::Received | ApplicationStatus::Cancelled
        )
    }

    /// Outcomes counted as a success in statistics.
    pub fn is_success(&self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::Received)
    }

    /// Applications in these states no longer raise deadline alerts.
    pub fn is_closed_for_alerts(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Approved
                | ApplicationStatus::Rejected
                | ApplicationStatus::Received
                | ApplicationStatus::Cancelled
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Planning => "計画中",
            ApplicationStatus::Preparing => "準備中",
            ApplicationStatus::DocumentCheck => "書類確認",
            ApplicationStatus::Submitted => "申請済",
            ApplicationStatus::UnderReview => "審査中",
            ApplicationStatus::Approved => "承認",
            ApplicationStatus::Rejected => "不承認",
            ApplicationStatus::Received => "受給済",
            ApplicationStatus::Cancelled => "取下げ",
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One client's tracked attempt to obtain a subsidy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SubsidyApplication {
    pub id: i64,
    pub subsidy_id: i64,
    pub client_id: i64,
    pub status: ApplicationStatus,
    pub amount_requested: Option<i64>,
    pub amount_approved: Option<i64>,
    pub amount_received: Option<i64>,
    pub submission_deadline: Option<NaiveDate>,
    /// Derived from checklist completion, 0-100.
    pub progress: i64,
    /// Assigned once, when the application is first submitted.
    pub application_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: i64,
    pub submitted_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A required or optional sub-task of an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChecklistItem {
    pub id: i64,
    pub application_id: i64,
    pub name: String,
    pub is_required: bool,
    pub is_completed: bool,
    pub sort_order: i64,
    pub completed_at: Option<DateTime<Utc>>,
}

/// An application joined with its subsidy/client names and checklist.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: SubsidyApplication,
    pub subsidy_name: String,
    pub client_name: String,
    pub checklist: Vec<ChecklistItem>,
}

/// An application listed with the names of its subsidy and client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ApplicationSummary {
    #[serde(flatten)]
    pub application: SubsidyApplication,
    pub subsidy_name: String,
    pub client_name: String,
}

/// Urgency bucket of a deadline alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Overdue,
    Urgent,
    Warning,
}

/// An approaching (or missed) submission deadline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DeadlineAlert {
    pub application_id: i64,
    pub subsidy_name: String,
    pub client_name: String,
    pub status: ApplicationStatus,
    pub deadline: NaiveDate,
    pub days_remaining: i64,
    pub level: AlertLevel,
}

/// Request payload for creating an application.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateApplicationRequest {
    pub subsidy_id: i64,
    pub client_id: i64,

    #[validate(range(min = 0, message = "Requested amount must not be negative"))]
    pub amount_requested: Option<i64>,

    #[validate(custom(function = "shared::validation::validate_date"))]
    pub submission_deadline: Option<String>,

    pub notes: Option<String>,
}

/// Request payload for editing application fields (partial update).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateApplicationRequest {
    #[validate(range(min = 0, message = "Requested amount must not be negative"))]
    pub amount_requested: Option<i64>,

    #[validate(custom(function = "shared::validation::validate_date"))]
    pub submission_deadline: Option<String>,

    pub notes: Option<String>,
}

/// Request payload for a status change.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateApplicationStatusRequest {
    pub status: ApplicationStatus,

    #[validate(range(min = 0, message = "Approved amount must not be negative"))]
    pub amount_approved: Option<i64>,

    #[validate(range(min = 0, message = "Received amount must not be negative"))]
    pub amount_received: Option<i64>,

    pub notes: Option<String>,
}

/// Request payload for toggling one checklist item.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateChecklistItemRequest {
    pub completed: bool,
}

fn default_required() -> bool {
    true
}

/// Request payload for adding a checklist item by hand.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddChecklistItemRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub name: String,

    #[serde(default = "default_required")]
    pub is_required: bool,
}

/// Query parameters for listing applications.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListApplicationsQuery {
    pub status: Option<ApplicationStatus>,
    pub client_id: Option<i64>,
    pub subsidy_id: Option<i64>,
}

/// Query parameters for the alert listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertsQuery {
    pub days: Option<i64>,
}

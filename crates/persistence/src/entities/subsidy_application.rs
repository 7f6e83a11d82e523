//! Subsidy application and checklist entities (database row mappings).

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::subsidy_application::{
    ApplicationStatus, ApplicationSummary, ChecklistItem, SubsidyApplication,
};
use domain::services::AlertCandidate;
use sqlx::FromRow;

/// Column list shared by every application query, qualified with the `a` alias.
pub(crate) const APPLICATION_COLUMNS: &str = "a.id, a.subsidy_id, a.client_id, a.status, \
     a.amount_requested, a.amount_approved, a.amount_received, a.submission_deadline, \
     a.progress, a.application_number, a.notes, a.created_by, a.submitted_at, a.decided_at, \
     a.created_at, a.updated_at";

/// Unqualified column list for `RETURNING` clauses.
pub(crate) const APPLICATION_FIELDS: &str = "id, subsidy_id, client_id, status, \
     amount_requested, amount_approved, amount_received, submission_deadline, \
     progress, application_number, notes, created_by, submitted_at, decided_at, \
     created_at, updated_at";

/// Database row mapping for the subsidy_applications table.
#[derive(Debug, Clone, FromRow)]
pub struct SubsidyApplicationEntity {
    pub id: i64,
    pub subsidy_id: i64,
    pub client_id: i64,
    pub status: ApplicationStatus,
    pub amount_requested: Option<i64>,
    pub amount_approved: Option<i64>,
    pub amount_received: Option<i64>,
    pub submission_deadline: Option<NaiveDate>,
    pub progress: i64,
    pub application_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: i64,
    pub submitted_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SubsidyApplicationEntity> for SubsidyApplication {
    fn from(entity: SubsidyApplicationEntity) -> Self {
        Self {
            id: entity.id,
            subsidy_id: entity.subsidy_id,
            client_id: entity.client_id,
            status: entity.status,
            amount_requested: entity.amount_requested,
            amount_approved: entity.amount_approved,
            amount_received: entity.amount_received,
            submission_deadline: entity.submission_deadline,
            progress: entity.progress,
            application_number: entity.application_number,
            notes: entity.notes,
            created_by: entity.created_by,
            submitted_at: entity.submitted_at,
            decided_at: entity.decided_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Application row joined with subsidy and client names.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationSummaryEntity {
    #[sqlx(flatten)]
    pub application: SubsidyApplicationEntity,
    pub subsidy_name: String,
    pub client_name: String,
}

impl From<ApplicationSummaryEntity> for ApplicationSummary {
    fn from(entity: ApplicationSummaryEntity) -> Self {
        Self {
            application: entity.application.into(),
            subsidy_name: entity.subsidy_name,
            client_name: entity.client_name,
        }
    }
}

/// Database row mapping for the subsidy_checklist_items table.
#[derive(Debug, Clone, FromRow)]
pub struct ChecklistItemEntity {
    pub id: i64,
    pub application_id: i64,
    pub name: String,
    pub is_required: bool,
    pub is_completed: bool,
    pub sort_order: i64,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<ChecklistItemEntity> for ChecklistItem {
    fn from(entity: ChecklistItemEntity) -> Self {
        Self {
            id: entity.id,
            application_id: entity.application_id,
            name: entity.name,
            is_required: entity.is_required,
            is_completed: entity.is_completed,
            sort_order: entity.sort_order,
            completed_at: entity.completed_at,
        }
    }
}

/// Open application with a deadline, as considered for alerting.
#[derive(Debug, Clone, FromRow)]
pub struct AlertCandidateEntity {
    pub application_id: i64,
    pub subsidy_name: String,
    pub client_name: String,
    pub status: ApplicationStatus,
    pub submission_deadline: Option<NaiveDate>,
}

impl From<AlertCandidateEntity> for AlertCandidate {
    fn from(entity: AlertCandidateEntity) -> Self {
        Self {
            application_id: entity.application_id,
            subsidy_name: entity.subsidy_name,
            client_name: entity.client_name,
            status: entity.status,
            deadline: entity.submission_deadline,
        }
    }
}

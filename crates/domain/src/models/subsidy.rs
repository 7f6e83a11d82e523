//! Subsidy master (grant program catalog) domain model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// How a subsidy program accepts applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ApplicationPeriodType {
    /// Applications accepted at any time.
    Anytime,
    /// A single window between start and end dates.
    Fixed,
    /// Recurring windows (e.g. quarterly).
    Periodic,
}

/// A catalog entry describing a grant or subsidy program.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Subsidy {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub managing_organization: Option<String>,
    pub description: Option<String>,
    pub max_amount: Option<i64>,
    /// Percentage of costs covered (0-100).
    pub subsidy_rate: Option<f64>,
    pub application_period_type: ApplicationPeriodType,
    pub application_start_date: Option<NaiveDate>,
    pub application_end_date: Option<NaiveDate>,
    /// Free text, one requirement per line.
    pub requirements: Option<String>,
    /// Free text, one document per line.
    pub required_documents: Option<String>,
    pub is_active: bool,
    pub application_count: i64,
    pub success_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subsidy {
    /// Whether the subsidy accepts applications on `date`.
    pub fn accepts_applications_on(&self, date: NaiveDate) -> bool {
        if !self.is_active {
            return false;
        }
        match self.application_period_type {
            ApplicationPeriodType::Anytime => true,
            ApplicationPeriodType::Fixed | ApplicationPeriodType::Periodic => {
                let after_start = self.application_start_date.map_or(true, |s| date >= s);
                let before_end = self.application_end_date.map_or(true, |e| date <= e);
                after_start && before_end
            }
        }
    }
}

fn default_period_type() -> ApplicationPeriodType {
    ApplicationPeriodType::Anytime
}

fn default_true() -> bool {
    true
}

/// Request payload for creating a subsidy master record.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateSubsidyRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub name: String,

    pub category: Option<String>,
    pub managing_organization: Option<String>,
    pub description: Option<String>,

    #[validate(range(min = 0, message = "Max amount must not be negative"))]
    pub max_amount: Option<i64>,

    #[validate(range(min = 0.0, max = 100.0, message = "Subsidy rate must be between 0 and 100"))]
    pub subsidy_rate: Option<f64>,

    #[serde(default = "default_period_type")]
    pub application_period_type: ApplicationPeriodType,

    #[validate(custom(function = "shared::validation::validate_date"))]
    pub application_start_date: Option<String>,

    #[validate(custom(function = "shared::validation::validate_date"))]
    pub application_end_date: Option<String>,

    pub requirements: Option<String>,
    pub required_documents: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Request payload for updating a subsidy (partial update).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateSubsidyRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    pub category: Option<String>,
    pub managing_organization: Option<String>,
    pub description: Option<String>,

    #[validate(range(min = 0, message = "Max amount must not be negative"))]
    pub max_amount: Option<i64>,

    #[validate(range(min = 0.0, max = 100.0, message = "Subsidy rate must be between 0 and 100"))]
    pub subsidy_rate: Option<f64>,

    pub application_period_type: Option<ApplicationPeriodType>,

    #[validate(custom(function = "shared::validation::validate_date"))]
    pub application_start_date: Option<String>,

    #[validate(custom(function = "shared::validation::validate_date"))]
    pub application_end_date: Option<String>,

    pub requirements: Option<String>,
    pub required_documents: Option<String>,
    pub is_active: Option<bool>,
}

/// Query parameters for listing subsidies.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListSubsidiesQuery {
    pub category: Option<String>,
    /// Only active programs when true.
    pub active_only: Option<bool>,
    /// Substring match on name or description.
    pub keyword: Option<String>,
}

/// Aggregated outcome statistics for one subsidy or the whole catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SubsidyStatistics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsidy_id: Option<i64>,
    pub application_count: i64,
    pub success_count: i64,
    /// Rounded percentage, 0 when there are no applications.
    pub success_rate: i64,
    pub avg_received_amount: Option<f64>,
}

//! Subsidy master entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::subsidy::ApplicationPeriodType;
use sqlx::FromRow;

/// Database row mapping for the subsidies table.
#[derive(Debug, Clone, FromRow)]
pub struct SubsidyEntity {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub managing_organization: Option<String>,
    pub description: Option<String>,
    pub max_amount: Option<i64>,
    pub subsidy_rate: Option<f64>,
    pub application_period_type: ApplicationPeriodType,
    pub application_start_date: Option<NaiveDate>,
    pub application_end_date: Option<NaiveDate>,
    pub requirements: Option<String>,
    pub required_documents: Option<String>,
    pub is_active: bool,
    pub application_count: i64,
    pub success_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SubsidyEntity> for domain::models::Subsidy {
    fn from(entity: SubsidyEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            category: entity.category,
            managing_organization: entity.managing_organization,
            description: entity.description,
            max_amount: entity.max_amount,
            subsidy_rate: entity.subsidy_rate,
            application_period_type: entity.application_period_type,
            application_start_date: entity.application_start_date,
            application_end_date: entity.application_end_date,
            requirements: entity.requirements,
            required_documents: entity.required_documents,
            is_active: entity.is_active,
            application_count: entity.application_count,
            success_count: entity.success_count,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Aggregated outcome counts over a set of applications.
#[derive(Debug, Clone, FromRow)]
pub struct SubsidyStatisticsEntity {
    pub application_count: i64,
    pub success_count: i64,
    pub avg_received_amount: Option<f64>,
}

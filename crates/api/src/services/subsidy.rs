//! Subsidy master and application workflows.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use domain::models::subsidy::{
    CreateSubsidyRequest, ListSubsidiesQuery, Subsidy, SubsidyStatistics, UpdateSubsidyRequest,
};
use domain::models::subsidy_application::{
    AddChecklistItemRequest, ApplicationDetail, ApplicationStatus, ApplicationSummary,
    ChecklistItem, CreateApplicationRequest, DeadlineAlert, ListApplicationsQuery,
    SubsidyApplication, UpdateApplicationRequest, UpdateApplicationStatusRequest,
};
use domain::services::subsidy_lifecycle::{
    application_number, build_alerts, build_statistics, checklist_items_from_text,
    validate_transition,
};
use persistence::repositories::{
    ApplicationFilter, ClientRepository, NewApplication, StatusChange, SubsidyApplicationRepository,
    SubsidyDeleteOutcome, SubsidyFields, SubsidyRepository,
};
use persistence::SqlitePool;
use shared::validation::parse_date;
use tracing::{info, warn};

use crate::error::ApiError;

/// Status of a freshly created application.
pub const INITIAL_STATUS: ApplicationStatus = ApplicationStatus::Planning;

fn parse_optional_date(
    value: Option<&str>,
    field: &str,
) -> Result<Option<chrono::NaiveDate>, ApiError> {
    match value {
        None => Ok(None),
        Some(v) => parse_date(v)
            .map(Some)
            .ok_or_else(|| ApiError::Validation(format!("Invalid {}: {}", field, v))),
    }
}

fn create_fields(request: &CreateSubsidyRequest) -> Result<SubsidyFields, ApiError> {
    Ok(SubsidyFields {
        name: Some(request.name.trim().to_string()),
        category: request.category.clone(),
        managing_organization: request.managing_organization.clone(),
        description: request.description.clone(),
        max_amount: request.max_amount,
        subsidy_rate: request.subsidy_rate,
        application_period_type: Some(request.application_period_type),
        application_start_date: parse_optional_date(
            request.application_start_date.as_deref(),
            "application_start_date",
        )?,
        application_end_date: parse_optional_date(
            request.application_end_date.as_deref(),
            "application_end_date",
        )?,
        requirements: request.requirements.clone(),
        required_documents: request.required_documents.clone(),
        is_active: Some(request.is_active),
    })
}

fn update_fields(request: &UpdateSubsidyRequest) -> Result<SubsidyFields, ApiError> {
    Ok(SubsidyFields {
        name: request.name.as_deref().map(|n| n.trim().to_string()),
        category: request.category.clone(),
        managing_organization: request.managing_organization.clone(),
        description: request.description.clone(),
        max_amount: request.max_amount,
        subsidy_rate: request.subsidy_rate,
        application_period_type: request.application_period_type,
        application_start_date: parse_optional_date(
            request.application_start_date.as_deref(),
            "application_start_date",
        )?,
        application_end_date: parse_optional_date(
            request.application_end_date.as_deref(),
            "application_end_date",
        )?,
        requirements: request.requirements.clone(),
        required_documents: request.required_documents.clone(),
        is_active: request.is_active,
    })
}

/// Subsidy catalog and application lifecycle operations.
#[derive(Clone)]
pub struct SubsidyService {
    subsidies: SubsidyRepository,
    applications: SubsidyApplicationRepository,
    clients: ClientRepository,
    strict_transitions: bool,
    time_zone: Tz,
}

impl SubsidyService {
    pub fn new(pool: SqlitePool, strict_transitions: bool, time_zone: Tz) -> Self {
        Self {
            subsidies: SubsidyRepository::new(pool.clone()),
            applications: SubsidyApplicationRepository::new(pool.clone()),
            clients: ClientRepository::new(pool),
            strict_transitions,
            time_zone,
        }
    }

    // --- catalog ---

    pub async fn list_subsidies(&self, query: &ListSubsidiesQuery) -> Result<Vec<Subsidy>, ApiError> {
        let rows = self
            .subsidies
            .list(
                query.category.as_deref(),
                query.active_only.unwrap_or(false),
                query.keyword.as_deref(),
            )
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_subsidy(&self, id: i64) -> Result<Subsidy, ApiError> {
        self.subsidies
            .find_by_id(id)
            .await?
            .map(Into::into)
            .ok_or_else(|| ApiError::NotFound(format!("Subsidy {} not found", id)))
    }

    pub async fn create_subsidy(
        &self,
        request: &CreateSubsidyRequest,
        now: DateTime<Utc>,
    ) -> Result<Subsidy, ApiError> {
        let fields = create_fields(request)?;
        let created = self
            .subsidies
            .create(request.name.trim(), &fields, now)
            .await?;
        info!(subsidy_id = created.id, name = %created.name, "Subsidy created");
        Ok(created.into())
    }

    pub async fn update_subsidy(
        &self,
        id: i64,
        request: &UpdateSubsidyRequest,
        now: DateTime<Utc>,
    ) -> Result<Subsidy, ApiError> {
        let fields = update_fields(request)?;
        self.subsidies
            .update(id, &fields, now)
            .await?
            .map(Into::into)
            .ok_or_else(|| ApiError::NotFound(format!("Subsidy {} not found", id)))
    }

    /// Soft-disables a subsidy; used instead of deleting one that is in use.
    pub async fn deactivate_subsidy(&self, id: i64, now: DateTime<Utc>) -> Result<Subsidy, ApiError> {
        self.subsidies
            .deactivate(id, now)
            .await?
            .map(Into::into)
            .ok_or_else(|| ApiError::NotFound(format!("Subsidy {} not found", id)))
    }

    /// Hard delete, refused while applications reference the subsidy.
    pub async fn delete_subsidy(&self, id: i64) -> Result<(), ApiError> {
        match self.subsidies.delete_if_unused(id).await? {
            SubsidyDeleteOutcome::Deleted => {
                info!(subsidy_id = id, "Subsidy deleted");
                Ok(())
            }
            SubsidyDeleteOutcome::NotFound => {
                Err(ApiError::NotFound(format!("Subsidy {} not found", id)))
            }
            SubsidyDeleteOutcome::InUse => Err(ApiError::Conflict(
                "Subsidy has applications; deactivate it instead".into(),
            )),
        }
    }

    pub async fn statistics(&self, subsidy_id: Option<i64>) -> Result<SubsidyStatistics, ApiError> {
        if let Some(id) = subsidy_id {
            self.get_subsidy(id).await?;
        }
        let stats = self.subsidies.statistics(subsidy_id).await?;
        Ok(build_statistics(
            subsidy_id,
            stats.application_count,
            stats.success_count,
            stats.avg_received_amount,
        ))
    }

    // --- applications ---

    /// Creates an application with a checklist seeded from the subsidy's
    /// required documents and requirements.
    pub async fn create_application(
        &self,
        request: &CreateApplicationRequest,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ApplicationDetail, ApiError> {
        let subsidy = self.get_subsidy(request.subsidy_id).await?;
        if self.clients.find_by_id(request.client_id).await?.is_none() {
            return Err(ApiError::NotFound(format!(
                "Client {} not found",
                request.client_id
            )));
        }
        if !subsidy.is_active {
            warn!(subsidy_id = subsidy.id, "Application created for an inactive subsidy");
        }

        let checklist = checklist_items_from_text(
            subsidy.required_documents.as_deref(),
            subsidy.requirements.as_deref(),
        );

        let application = NewApplication {
            subsidy_id: subsidy.id,
            client_id: request.client_id,
            status: INITIAL_STATUS,
            amount_requested: request.amount_requested,
            submission_deadline: parse_optional_date(
                request.submission_deadline.as_deref(),
                "submission_deadline",
            )?,
            notes: request.notes.clone(),
            created_by: user_id,
        };

        let created = self
            .applications
            .create_with_checklist(&application, &checklist, now)
            .await?;

        info!(
            application_id = created.id,
            subsidy_id = subsidy.id,
            client_id = request.client_id,
            checklist_items = checklist.len(),
            "Subsidy application created"
        );

        self.get_application(created.id).await
    }

    pub async fn list_applications(
        &self,
        query: &ListApplicationsQuery,
    ) -> Result<Vec<ApplicationSummary>, ApiError> {
        let filter = ApplicationFilter {
            status: query.status,
            client_id: query.client_id,
            subsidy_id: query.subsidy_id,
        };
        let rows = self.applications.list(&filter).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_application(&self, id: i64) -> Result<ApplicationDetail, ApiError> {
        let summary: ApplicationSummary = self
            .applications
            .find_summary(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Application {} not found", id)))?
            .into();

        let checklist = self
            .applications
            .list_items(id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(ApplicationDetail {
            application: summary.application,
            subsidy_name: summary.subsidy_name,
            client_name: summary.client_name,
            checklist,
        })
    }

    pub async fn update_application(
        &self,
        id: i64,
        request: &UpdateApplicationRequest,
        now: DateTime<Utc>,
    ) -> Result<SubsidyApplication, ApiError> {
        let deadline = parse_optional_date(
            request.submission_deadline.as_deref(),
            "submission_deadline",
        )?;
        self.applications
            .update_fields(id, request.amount_requested, deadline, request.notes.as_deref(), now)
            .await?
            .map(Into::into)
            .ok_or_else(|| ApiError::NotFound(format!("Application {} not found", id)))
    }

    /// Moves an application to a new status.
    ///
    /// Irregular transitions are logged, or rejected when strict transitions
    /// are configured. The first move to `submitted` assigns the application
    /// number and submission time.
    pub async fn update_status(
        &self,
        id: i64,
        request: &UpdateApplicationStatusRequest,
        now: DateTime<Utc>,
    ) -> Result<SubsidyApplication, ApiError> {
        let current: SubsidyApplication = self
            .applications
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Application {} not found", id)))?
            .into();

        let to = request.status;
        if let Err(err) = validate_transition(current.status, to) {
            if self.strict_transitions {
                return Err(err.into());
            }
            warn!(application_id = id, error = %err, "Accepting irregular status transition");
        }

        let submitted = to == ApplicationStatus::Submitted;
        let decided = matches!(to, ApplicationStatus::Approved | ApplicationStatus::Rejected);

        let change = StatusChange {
            status: to,
            amount_approved: request.amount_approved,
            amount_received: request.amount_received,
            notes: request.notes.clone(),
            submitted_at: submitted.then_some(now),
            application_number: submitted.then(|| application_number(id, now)),
            decided_at: decided.then_some(now),
        };

        let updated: SubsidyApplication = self
            .applications
            .apply_status_change(id, &change, now)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Application {} not found", id)))?
            .into();

        info!(
            application_id = id,
            from = %current.status,
            to = %updated.status,
            "Application status changed"
        );
        Ok(updated)
    }

    pub async fn add_checklist_item(
        &self,
        application_id: i64,
        request: &AddChecklistItemRequest,
        now: DateTime<Utc>,
    ) -> Result<ChecklistItem, ApiError> {
        self.ensure_application(application_id).await?;
        let item = self
            .applications
            .add_item(application_id, request.name.trim(), request.is_required, now)
            .await?;
        Ok(item.into())
    }

    /// Toggles one checklist item; progress is recomputed with it.
    pub async fn update_checklist_item(
        &self,
        application_id: i64,
        item_id: i64,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<ChecklistItem, ApiError> {
        self.applications
            .set_item_completed(application_id, item_id, completed, now)
            .await?
            .map(Into::into)
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "Checklist item {} not found on application {}",
                    item_id, application_id
                ))
            })
    }

    pub async fn delete_checklist_item(
        &self,
        application_id: i64,
        item_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        if self.applications.delete_item(application_id, item_id, now).await? {
            Ok(())
        } else {
            Err(ApiError::NotFound(format!(
                "Checklist item {} not found on application {}",
                item_id, application_id
            )))
        }
    }

    /// Open applications due within `window_days`, most urgent first.
    pub async fn list_alerts(
        &self,
        window_days: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<DeadlineAlert>, ApiError> {
        if window_days < 0 {
            return Err(ApiError::Validation("Alert window must not be negative".into()));
        }
        // candidates up to one extra day; days_remaining rounds up
        let local_today = now.with_timezone(&self.time_zone).date_naive();
        let horizon = local_today + Duration::days(window_days + 1);
        let candidates = self.applications.alert_candidates(horizon).await?;
        Ok(build_alerts(
            candidates.into_iter().map(Into::into),
            now,
            self.time_zone,
            window_days,
        ))
    }

    async fn ensure_application(&self, id: i64) -> Result<(), ApiError> {
        match self.applications.find_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::NotFound(format!("Application {} not found", id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::client::CreateClientRequest;
    use domain::models::subsidy::ApplicationPeriodType;
    use domain::models::subsidy_application::AlertLevel;

    struct Fixture {
        service: SubsidyService,
        subsidy_id: i64,
        client_id: i64,
        user_id: i64,
    }

    async fn fixture(strict: bool) -> Fixture {
        let pool = persistence::db::create_memory_pool().await.unwrap();
        let now = Utc::now();
        let user = persistence::repositories::UserRepository::new(pool.clone())
            .insert("山田", Some("yamada@example.com"), "staff")
            .await
            .unwrap();
        let client = ClientRepository::new(pool.clone())
            .create(
                &CreateClientRequest {
                    name: "ABC社".into(),
                    contact_person: None,
                    email: None,
                    phone: None,
                    address: None,
                    employee_count: 20,
                    monthly_fee: 0,
                    notes: None,
                },
                now,
            )
            .await
            .unwrap();

        let service = SubsidyService::new(pool, strict, chrono_tz::Asia::Tokyo);
        let subsidy = service
            .create_subsidy(
                &CreateSubsidyRequest {
                    name: "雇用調整助成金".into(),
                    category: Some("雇用".into()),
                    managing_organization: None,
                    description: None,
                    max_amount: Some(500_000),
                    subsidy_rate: Some(75.0),
                    application_period_type: ApplicationPeriodType::Anytime,
                    application_start_date: None,
                    application_end_date: None,
                    requirements: Some("・休業計画届\n・休業協定書\n・出勤簿\n・賃金台帳".into()),
                    required_documents: None,
                    is_active: true,
                },
                now,
            )
            .await
            .unwrap();

        Fixture {
            service,
            subsidy_id: subsidy.id,
            client_id: client.id,
            user_id: user.id,
        }
    }

    fn create_request(f: &Fixture, deadline: Option<String>) -> CreateApplicationRequest {
        CreateApplicationRequest {
            subsidy_id: f.subsidy_id,
            client_id: f.client_id,
            amount_requested: Some(300_000),
            submission_deadline: deadline,
            notes: None,
        }
    }

    fn status(status: ApplicationStatus) -> UpdateApplicationStatusRequest {
        UpdateApplicationStatusRequest {
            status,
            amount_approved: None,
            amount_received: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_application_scenario() {
        let f = fixture(false).await;
        let now = Utc::now();
        let deadline = (now + Duration::days(10)).date_naive().to_string();

        let detail = f
            .service
            .create_application(&create_request(&f, Some(deadline)), f.user_id, now)
            .await
            .unwrap();
        assert_eq!(detail.application.status, INITIAL_STATUS);
        assert_eq!(detail.checklist.len(), 4);
        assert_eq!(detail.checklist[0].name, "休業計画届");

        let stats = f.service.statistics(Some(f.subsidy_id)).await.unwrap();
        assert_eq!(stats.application_count, 1);
        assert_eq!(stats.success_count, 0);

        let id = detail.application.id;
        for item in &detail.checklist[..2] {
            f.service
                .update_checklist_item(id, item.id, true, now)
                .await
                .unwrap();
        }
        let detail = f.service.get_application(id).await.unwrap();
        assert_eq!(detail.application.progress, 50);

        let alerts = f.service.list_alerts(14, now).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].application_id, id);
        assert!((9..=10).contains(&alerts[0].days_remaining));
        assert_eq!(alerts[0].level, AlertLevel::Warning);

        f.service
            .update_status(id, &status(ApplicationStatus::Approved), now)
            .await
            .unwrap();
        assert!(f.service.list_alerts(14, now).await.unwrap().is_empty());

        let stats = f.service.statistics(None).await.unwrap();
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.success_rate, 100);
    }

    #[tokio::test]
    async fn test_submission_assigns_number_once() {
        let f = fixture(false).await;
        let now = Utc::now();
        let detail = f
            .service
            .create_application(&create_request(&f, None), f.user_id, now)
            .await
            .unwrap();
        let id = detail.application.id;

        let submitted = f
            .service
            .update_status(id, &status(ApplicationStatus::Submitted), now)
            .await
            .unwrap();
        let number = submitted.application_number.clone().unwrap();
        assert_eq!(number, application_number(id, now));

        let later = now + Duration::days(400);
        let resubmitted = f
            .service
            .update_status(id, &status(ApplicationStatus::Submitted), later)
            .await
            .unwrap();
        assert_eq!(resubmitted.application_number, Some(number));
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_skipping_submission() {
        let f = fixture(true).await;
        let now = Utc::now();
        let detail = f
            .service
            .create_application(&create_request(&f, None), f.user_id, now)
            .await
            .unwrap();

        let err = f
            .service
            .update_status(detail.application.id, &status(ApplicationStatus::Approved), now)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_lenient_mode_accepts_irregular_transition() {
        let f = fixture(false).await;
        let now = Utc::now();
        let detail = f
            .service
            .create_application(&create_request(&f, None), f.user_id, now)
            .await
            .unwrap();

        let updated = f
            .service
            .update_status(detail.application.id, &status(ApplicationStatus::Approved), now)
            .await
            .unwrap();
        assert_eq!(updated.status, ApplicationStatus::Approved);
    }

    #[tokio::test]
    async fn test_delete_subsidy_in_use_conflicts() {
        let f = fixture(false).await;
        let now = Utc::now();
        f.service
            .create_application(&create_request(&f, None), f.user_id, now)
            .await
            .unwrap();

        assert!(matches!(
            f.service.delete_subsidy(f.subsidy_id).await,
            Err(ApiError::Conflict(_))
        ));
        let deactivated = f.service.deactivate_subsidy(f.subsidy_id, now).await.unwrap();
        assert!(!deactivated.is_active);
    }

    #[tokio::test]
    async fn test_create_application_unknown_client() {
        let f = fixture(false).await;
        let mut request = create_request(&f, None);
        request.client_id = 9999;
        assert!(matches!(
            f.service
                .create_application(&request, f.user_id, Utc::now())
                .await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_alerts_exclude_closed_and_sort_by_urgency() {
        let f = fixture(false).await;
        let now = Utc::now();
        let far = (now + Duration::days(20)).date_naive().to_string();
        let near = (now + Duration::days(5)).date_naive().to_string();
        let past = (now - Duration::days(2)).date_naive().to_string();

        let a_far = f
            .service
            .create_application(&create_request(&f, Some(far)), f.user_id, now)
            .await
            .unwrap();
        let a_near = f
            .service
            .create_application(&create_request(&f, Some(near.clone())), f.user_id, now)
            .await
            .unwrap();
        let a_past = f
            .service
            .create_application(&create_request(&f, Some(past)), f.user_id, now)
            .await
            .unwrap();
        let approved = f
            .service
            .create_application(&create_request(&f, Some(near)), f.user_id, now)
            .await
            .unwrap();
        f.service
            .update_status(approved.application.id, &status(ApplicationStatus::Approved), now)
            .await
            .unwrap();

        let alerts = f.service.list_alerts(30, now).await.unwrap();
        let ids: Vec<i64> = alerts.iter().map(|a| a.application_id).collect();
        assert_eq!(
            ids,
            vec![a_past.application.id, a_near.application.id, a_far.application.id]
        );
        assert_eq!(alerts[0].level, AlertLevel::Overdue);
        assert_eq!(alerts[1].level, AlertLevel::Urgent);
    }

    #[tokio::test]
    async fn test_alerts_follow_office_day_boundary() {
        use chrono::TimeZone;

        let f = fixture(false).await;
        // 08:00 on 1 March in Tokyo
        let now = Utc.with_ymd_and_hms(2025, 2, 28, 23, 0, 0).unwrap();
        let yesterday = f
            .service
            .create_application(&create_request(&f, Some("2025-02-28".into())), f.user_id, now)
            .await
            .unwrap();
        let today = f
            .service
            .create_application(&create_request(&f, Some("2025-03-01".into())), f.user_id, now)
            .await
            .unwrap();
        let edge = f
            .service
            .create_application(&create_request(&f, Some("2025-03-08".into())), f.user_id, now)
            .await
            .unwrap();

        let alerts = f.service.list_alerts(7, now).await.unwrap();
        let ids: Vec<i64> = alerts.iter().map(|a| a.application_id).collect();
        assert_eq!(
            ids,
            vec![yesterday.application.id, today.application.id, edge.application.id]
        );
        assert_eq!(alerts[0].days_remaining, -1);
        assert_eq!(alerts[0].level, AlertLevel::Overdue);
        assert_eq!(alerts[1].days_remaining, 0);
        assert_eq!(alerts[2].days_remaining, 7);
    }
}

//! Subsidy application and checklist repository.
//!
//! Checklist writes recompute the owning application's progress, and
//! application inserts and status changes refresh the subsidy counters, in
//! the same transaction as the write itself.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::subsidy_application::ApplicationStatus;
use domain::services::subsidy_lifecycle::compute_progress;
use sqlx::{SqliteConnection, SqlitePool};

use crate::entities::subsidy_application::{APPLICATION_COLUMNS, APPLICATION_FIELDS};
use crate::entities::{
    AlertCandidateEntity, ApplicationSummaryEntity, ChecklistItemEntity, SubsidyApplicationEntity,
};
use crate::metrics::QueryTimer;
use crate::repositories::subsidy::refresh_subsidy_counts;

const SUMMARY_JOINS: &str = "FROM subsidy_applications a \
     JOIN subsidies s ON s.id = a.subsidy_id \
     JOIN clients c ON c.id = a.client_id";

const ITEM_COLUMNS: &str =
    "id, application_id, name, is_required, is_completed, sort_order, completed_at";

/// Values for a new application row.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub subsidy_id: i64,
    pub client_id: i64,
    pub status: ApplicationStatus,
    pub amount_requested: Option<i64>,
    pub submission_deadline: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: i64,
}

/// Filters for application listings. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub client_id: Option<i64>,
    pub subsidy_id: Option<i64>,
}

/// A status change as decided by the lifecycle rules.
///
/// `submitted_at`, `application_number` and `decided_at` are only written
/// when the row does not carry a value yet.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: ApplicationStatus,
    pub amount_approved: Option<i64>,
    pub amount_received: Option<i64>,
    pub notes: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub application_number: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// Repository for subsidy applications and their checklists.
#[derive(Clone)]
pub struct SubsidyApplicationRepository {
    pool: SqlitePool,
}

impl SubsidyApplicationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts an application with its seeded checklist.
    pub async fn create_with_checklist(
        &self,
        application: &NewApplication,
        checklist: &[String],
        now: DateTime<Utc>,
    ) -> Result<SubsidyApplicationEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_subsidy_application");
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO subsidy_applications (subsidy_id, client_id, status, amount_requested,
                                              submission_deadline, notes, created_by,
                                              created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            RETURNING {APPLICATION_FIELDS}
            "#
        );
        let created = sqlx::query_as::<_, SubsidyApplicationEntity>(&sql)
            .bind(application.subsidy_id)
            .bind(application.client_id)
            .bind(application.status)
            .bind(application.amount_requested)
            .bind(application.submission_deadline)
            .bind(&application.notes)
            .bind(application.created_by)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        for (index, name) in checklist.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO subsidy_checklist_items (application_id, name, is_required,
                                                     is_completed, sort_order, created_at)
                VALUES (?1, ?2, 1, 0, ?3, ?4)
                "#,
            )
            .bind(created.id)
            .bind(name)
            .bind(index as i64 + 1)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        refresh_subsidy_counts(&mut *tx, created.subsidy_id, now).await?;
        tx.commit().await?;
        timer.record();
        Ok(created)
    }

    pub async fn find_by_id(
        &self,
        id: i64,
    ) -> Result<Option<SubsidyApplicationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_subsidy_application_by_id");
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM subsidy_applications a WHERE a.id = ?1");
        let result = sqlx::query_as::<_, SubsidyApplicationEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Application joined with subsidy and client names.
    pub async fn find_summary(
        &self,
        id: i64,
    ) -> Result<Option<ApplicationSummaryEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_subsidy_application_summary");
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS}, s.name AS subsidy_name, c.name AS client_name \
             {SUMMARY_JOINS} WHERE a.id = ?1"
        );
        let result = sqlx::query_as::<_, ApplicationSummaryEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Lists applications, nearest deadline first; undated ones last.
    pub async fn list(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicationSummaryEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_subsidy_applications");
        let sql = format!(
            r#"
            SELECT {APPLICATION_COLUMNS}, s.name AS subsidy_name, c.name AS client_name
            {SUMMARY_JOINS}
            WHERE (?1 IS NULL OR a.status = ?1)
              AND (?2 IS NULL OR a.client_id = ?2)
              AND (?3 IS NULL OR a.subsidy_id = ?3)
            ORDER BY a.submission_deadline IS NULL, a.submission_deadline, a.id
            "#
        );
        let result = sqlx::query_as::<_, ApplicationSummaryEntity>(&sql)
            .bind(filter.status)
            .bind(filter.client_id)
            .bind(filter.subsidy_id)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Updates amount requested, deadline and notes.
    pub async fn update_fields(
        &self,
        id: i64,
        amount_requested: Option<i64>,
        submission_deadline: Option<NaiveDate>,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<SubsidyApplicationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_subsidy_application");
        let sql = format!(
            r#"
            UPDATE subsidy_applications SET
                amount_requested = COALESCE(?2, amount_requested),
                submission_deadline = COALESCE(?3, submission_deadline),
                notes = COALESCE(?4, notes),
                updated_at = ?5
            WHERE id = ?1
            RETURNING {APPLICATION_FIELDS}
            "#
        );
        let result = sqlx::query_as::<_, SubsidyApplicationEntity>(&sql)
            .bind(id)
            .bind(amount_requested)
            .bind(submission_deadline)
            .bind(notes)
            .bind(now)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Writes a status change and refreshes the subsidy counters.
    pub async fn apply_status_change(
        &self,
        id: i64,
        change: &StatusChange,
        now: DateTime<Utc>,
    ) -> Result<Option<SubsidyApplicationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_subsidy_application_status");
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE subsidy_applications SET
                status = ?2,
                amount_approved = COALESCE(?3, amount_approved),
                amount_received = COALESCE(?4, amount_received),
                notes = COALESCE(?5, notes),
                submitted_at = COALESCE(submitted_at, ?6),
                application_number = COALESCE(application_number, ?7),
                decided_at = COALESCE(decided_at, ?8),
                updated_at = ?9
            WHERE id = ?1
            RETURNING {APPLICATION_FIELDS}
            "#
        );
        let updated = sqlx::query_as::<_, SubsidyApplicationEntity>(&sql)
            .bind(id)
            .bind(change.status)
            .bind(change.amount_approved)
            .bind(change.amount_received)
            .bind(&change.notes)
            .bind(change.submitted_at)
            .bind(&change.application_number)
            .bind(change.decided_at)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(application) = &updated {
            refresh_subsidy_counts(&mut *tx, application.subsidy_id, now).await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(updated)
    }

    pub async fn list_items(
        &self,
        application_id: i64,
    ) -> Result<Vec<ChecklistItemEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_checklist_items");
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM subsidy_checklist_items \
             WHERE application_id = ?1 ORDER BY sort_order, id"
        );
        let result = sqlx::query_as::<_, ChecklistItemEntity>(&sql)
            .bind(application_id)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Appends an item at the end of the checklist.
    pub async fn add_item(
        &self,
        application_id: i64,
        name: &str,
        is_required: bool,
        now: DateTime<Utc>,
    ) -> Result<ChecklistItemEntity, sqlx::Error> {
        let timer = QueryTimer::new("add_checklist_item");
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO subsidy_checklist_items (application_id, name, is_required, is_completed,
                                                 sort_order, created_at)
            VALUES (?1, ?2, ?3, 0,
                    (SELECT COALESCE(MAX(sort_order), 0) + 1
                     FROM subsidy_checklist_items WHERE application_id = ?1),
                    ?4)
            RETURNING {ITEM_COLUMNS}
            "#
        );
        let item = sqlx::query_as::<_, ChecklistItemEntity>(&sql)
            .bind(application_id)
            .bind(name)
            .bind(is_required)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        recompute_progress(&mut *tx, application_id, now).await?;
        tx.commit().await?;
        timer.record();
        Ok(item)
    }

    /// Sets the completion flag of one item. `None` when the item does not
    /// belong to the application.
    pub async fn set_item_completed(
        &self,
        application_id: i64,
        item_id: i64,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<ChecklistItemEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_checklist_item");
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE subsidy_checklist_items SET
                is_completed = ?3,
                completed_at = CASE WHEN ?3 THEN ?4 ELSE NULL END
            WHERE id = ?2 AND application_id = ?1
            RETURNING {ITEM_COLUMNS}
            "#
        );
        let item = sqlx::query_as::<_, ChecklistItemEntity>(&sql)
            .bind(application_id)
            .bind(item_id)
            .bind(completed)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

        if item.is_some() {
            recompute_progress(&mut *tx, application_id, now).await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(item)
    }

    /// Removes one item. Returns false when nothing matched.
    pub async fn delete_item(
        &self,
        application_id: i64,
        item_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_checklist_item");
        let mut tx = self.pool.begin().await?;

        let deleted =
            sqlx::query("DELETE FROM subsidy_checklist_items WHERE id = ?2 AND application_id = ?1")
                .bind(application_id)
                .bind(item_id)
                .execute(&mut *tx)
                .await?
                .rows_affected()
                > 0;

        if deleted {
            recompute_progress(&mut *tx, application_id, now).await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(deleted)
    }

    /// Applications with a deadline on or before `horizon`, joined with names.
    ///
    /// Status filtering is left to the lifecycle rules.
    pub async fn alert_candidates(
        &self,
        horizon: NaiveDate,
    ) -> Result<Vec<AlertCandidateEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_alert_candidates");
        let sql = format!(
            r#"
            SELECT a.id AS application_id, s.name AS subsidy_name, c.name AS client_name,
                   a.status, a.submission_deadline
            {SUMMARY_JOINS}
            WHERE a.submission_deadline IS NOT NULL
              AND a.submission_deadline <= ?1
              AND a.status NOT IN ('approved', 'rejected', 'received', 'cancelled')
            "#
        );
        let result = sqlx::query_as::<_, AlertCandidateEntity>(&sql)
            .bind(horizon)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }
}

/// Rewrites an application's progress from its checklist.
async fn recompute_progress(
    conn: &mut SqliteConnection,
    application_id: i64,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let (total, completed): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COALESCE(SUM(CASE WHEN is_completed THEN 1 ELSE 0 END), 0)
        FROM subsidy_checklist_items
        WHERE application_id = ?1
        "#,
    )
    .bind(application_id)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("UPDATE subsidy_applications SET progress = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(application_id)
        .bind(compute_progress(completed, total))
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

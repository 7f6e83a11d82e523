//! Subsidy master repository for database operations.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::subsidy::ApplicationPeriodType;
use sqlx::{SqliteConnection, SqlitePool};

use crate::entities::{SubsidyEntity, SubsidyStatisticsEntity};
use crate::metrics::QueryTimer;

const SUBSIDY_COLUMNS: &str = "id, name, category, managing_organization, description, max_amount, \
     subsidy_rate, application_period_type, application_start_date, application_end_date, \
     requirements, required_documents, is_active, application_count, success_count, \
     created_at, updated_at";

/// Fields written when creating or updating a subsidy.
#[derive(Debug, Clone, Default)]
pub struct SubsidyFields {
    pub name: Option<String>,
    pub category: Option<String>,
    pub managing_organization: Option<String>,
    pub description: Option<String>,
    pub max_amount: Option<i64>,
    pub subsidy_rate: Option<f64>,
    pub application_period_type: Option<ApplicationPeriodType>,
    pub application_start_date: Option<NaiveDate>,
    pub application_end_date: Option<NaiveDate>,
    pub requirements: Option<String>,
    pub required_documents: Option<String>,
    pub is_active: Option<bool>,
}

/// Outcome of a guarded delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsidyDeleteOutcome {
    Deleted,
    NotFound,
    /// Applications still reference the subsidy.
    InUse,
}

/// Repository for subsidy master records.
#[derive(Clone)]
pub struct SubsidyRepository {
    pool: SqlitePool,
}

impl SubsidyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Lists subsidies by name with optional category, active and keyword filters.
    pub async fn list(
        &self,
        category: Option<&str>,
        active_only: bool,
        keyword: Option<&str>,
    ) -> Result<Vec<SubsidyEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_subsidies");
        let sql = format!(
            r#"
            SELECT {SUBSIDY_COLUMNS}
            FROM subsidies
            WHERE (?1 IS NULL OR category = ?1)
              AND (?2 = 0 OR is_active = 1)
              AND (?3 IS NULL OR name LIKE '%' || ?3 || '%' OR description LIKE '%' || ?3 || '%')
            ORDER BY name, id
            "#
        );
        let result = sqlx::query_as::<_, SubsidyEntity>(&sql)
            .bind(category)
            .bind(active_only)
            .bind(keyword)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<SubsidyEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_subsidy_by_id");
        let sql = format!("SELECT {SUBSIDY_COLUMNS} FROM subsidies WHERE id = ?1");
        let result = sqlx::query_as::<_, SubsidyEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn create(
        &self,
        name: &str,
        fields: &SubsidyFields,
        now: DateTime<Utc>,
    ) -> Result<SubsidyEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_subsidy");
        let sql = format!(
            r#"
            INSERT INTO subsidies (name, category, managing_organization, description, max_amount,
                                   subsidy_rate, application_period_type, application_start_date,
                                   application_end_date, requirements, required_documents,
                                   is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            RETURNING {SUBSIDY_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, SubsidyEntity>(&sql)
            .bind(name)
            .bind(&fields.category)
            .bind(&fields.managing_organization)
            .bind(&fields.description)
            .bind(fields.max_amount)
            .bind(fields.subsidy_rate)
            .bind(
                fields
                    .application_period_type
                    .unwrap_or(ApplicationPeriodType::Anytime),
            )
            .bind(fields.application_start_date)
            .bind(fields.application_end_date)
            .bind(&fields.requirements)
            .bind(&fields.required_documents)
            .bind(fields.is_active.unwrap_or(true))
            .bind(now)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn update(
        &self,
        id: i64,
        fields: &SubsidyFields,
        now: DateTime<Utc>,
    ) -> Result<Option<SubsidyEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_subsidy");
        let sql = format!(
            r#"
            UPDATE subsidies SET
                name = COALESCE(?2, name),
                category = COALESCE(?3, category),
                managing_organization = COALESCE(?4, managing_organization),
                description = COALESCE(?5, description),
                max_amount = COALESCE(?6, max_amount),
                subsidy_rate = COALESCE(?7, subsidy_rate),
                application_period_type = COALESCE(?8, application_period_type),
                application_start_date = COALESCE(?9, application_start_date),
                application_end_date = COALESCE(?10, application_end_date),
                requirements = COALESCE(?11, requirements),
                required_documents = COALESCE(?12, required_documents),
                is_active = COALESCE(?13, is_active),
                updated_at = ?14
            WHERE id = ?1
            RETURNING {SUBSIDY_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, SubsidyEntity>(&sql)
            .bind(id)
            .bind(&fields.name)
            .bind(&fields.category)
            .bind(&fields.managing_organization)
            .bind(&fields.description)
            .bind(fields.max_amount)
            .bind(fields.subsidy_rate)
            .bind(fields.application_period_type)
            .bind(fields.application_start_date)
            .bind(fields.application_end_date)
            .bind(&fields.requirements)
            .bind(&fields.required_documents)
            .bind(fields.is_active)
            .bind(now)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Soft-disables a subsidy.
    pub async fn deactivate(
        &self,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<SubsidyEntity>, sqlx::Error> {
        let timer = QueryTimer::new("deactivate_subsidy");
        let sql = format!(
            "UPDATE subsidies SET is_active = 0, updated_at = ?2 WHERE id = ?1 RETURNING {SUBSIDY_COLUMNS}"
        );
        let result = sqlx::query_as::<_, SubsidyEntity>(&sql)
            .bind(id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Hard-deletes a subsidy only when no application references it.
    pub async fn delete_if_unused(&self, id: i64) -> Result<SubsidyDeleteOutcome, sqlx::Error> {
        let timer = QueryTimer::new("delete_subsidy");
        let mut tx = self.pool.begin().await?;

        let count: Option<(i64,)> =
            sqlx::query_as("SELECT application_count FROM subsidies WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let outcome = match count {
            None => SubsidyDeleteOutcome::NotFound,
            Some((n,)) if n > 0 => SubsidyDeleteOutcome::InUse,
            Some(_) => {
                sqlx::query("DELETE FROM subsidies WHERE id = ?1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                SubsidyDeleteOutcome::Deleted
            }
        };

        tx.commit().await?;
        timer.record();
        Ok(outcome)
    }

    /// Outcome counts over one subsidy's applications, or all of them.
    pub async fn statistics(
        &self,
        subsidy_id: Option<i64>,
    ) -> Result<SubsidyStatisticsEntity, sqlx::Error> {
        let timer = QueryTimer::new("subsidy_statistics");
        let result = sqlx::query_as::<_, SubsidyStatisticsEntity>(
            r#"
            SELECT
                COUNT(*) AS application_count,
                COALESCE(SUM(CASE WHEN status IN ('approved', 'received') THEN 1 ELSE 0 END), 0)
                    AS success_count,
                AVG(CASE WHEN status IN ('approved', 'received')
                         THEN COALESCE(amount_received, amount_approved) END)
                    AS avg_received_amount
            FROM subsidy_applications
            WHERE (?1 IS NULL OR subsidy_id = ?1)
            "#,
        )
        .bind(subsidy_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}

/// Recomputes the denormalized counters of a subsidy from its applications.
pub(crate) async fn refresh_subsidy_counts(
    conn: &mut SqliteConnection,
    subsidy_id: i64,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE subsidies SET
            application_count = (SELECT COUNT(*) FROM subsidy_applications WHERE subsidy_id = ?1),
            success_count = (SELECT COUNT(*) FROM subsidy_applications
                             WHERE subsidy_id = ?1 AND status IN ('approved', 'received')),
            updated_at = ?2
        WHERE id = ?1
        "#,
    )
    .bind(subsidy_id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    fn fields() -> SubsidyFields {
        SubsidyFields {
            category: Some("雇用維持".into()),
            max_amount: Some(500_000),
            subsidy_rate: Some(75.0),
            requirements: Some("休業協定書\n休業実績一覧表".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_list_and_deactivate() {
        let repo = SubsidyRepository::new(create_memory_pool().await.unwrap());
        let now = Utc::now();
        let subsidy = repo.create("雇用調整助成金", &fields(), now).await.unwrap();
        assert!(subsidy.is_active);
        assert_eq!(subsidy.application_count, 0);
        assert_eq!(subsidy.application_period_type, ApplicationPeriodType::Anytime);

        repo.create("キャリアアップ助成金", &SubsidyFields::default(), now)
            .await
            .unwrap();

        assert_eq!(repo.list(Some("雇用維持"), false, None).await.unwrap().len(), 1);
        assert_eq!(repo.list(None, false, Some("キャリア")).await.unwrap().len(), 1);

        repo.deactivate(subsidy.id, now).await.unwrap().unwrap();
        assert_eq!(repo.list(None, true, None).await.unwrap().len(), 1);
        assert_eq!(repo.list(None, false, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_unused() {
        let repo = SubsidyRepository::new(create_memory_pool().await.unwrap());
        let subsidy = repo.create("s", &fields(), Utc::now()).await.unwrap();

        assert_eq!(
            repo.delete_if_unused(subsidy.id).await.unwrap(),
            SubsidyDeleteOutcome::Deleted
        );
        assert_eq!(
            repo.delete_if_unused(subsidy.id).await.unwrap(),
            SubsidyDeleteOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_statistics_empty() {
        let repo = SubsidyRepository::new(create_memory_pool().await.unwrap());
        let stats = repo.statistics(None).await.unwrap();
        assert_eq!(stats.application_count, 0);
        assert_eq!(stats.success_count, 0);
        assert!(stats.avg_received_amount.is_none());
    }
}

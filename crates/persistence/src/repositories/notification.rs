//! Notification log, schedule and settings repository.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::notification::{NotificationSettings, NotificationType, ScheduledStatus};
use sqlx::SqlitePool;

use crate::entities::{
    NotificationLogEntity, NotificationSettingsEntity, ScheduledNotificationEntity,
};
use crate::metrics::QueryTimer;

const LOG_COLUMNS: &str = "id, user_id, notification_type, task_id, message, is_read, sent_at";

const SCHEDULED_COLUMNS: &str = "id, task_id, user_id, notification_type, scheduled_at, status, \
     processed_at, error_message, created_at";

/// A notification log row to write.
#[derive(Debug, Clone)]
pub struct NewNotificationLog<'a> {
    pub user_id: i64,
    pub notification_type: NotificationType,
    pub task_id: Option<i64>,
    pub message: Option<&'a str>,
    /// Office-local day the notice belongs to.
    pub log_date: NaiveDate,
}

/// Repository for notification persistence.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Records a sent notification.
    ///
    /// Returns false when an unread overdue notice for the same task and
    /// day already exists; nothing is written in that case.
    pub async fn insert_log(
        &self,
        log: &NewNotificationLog<'_>,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("insert_notification_log");
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO notification_logs
                (user_id, notification_type, task_id, message, log_date, is_read, sent_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
            "#,
        )
        .bind(log.user_id)
        .bind(log.notification_type)
        .bind(log.task_id)
        .bind(log.message)
        .bind(log.log_date)
        .bind(now)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    /// Whether a notice of this type was logged for the task on `day`.
    pub async fn has_log_on(
        &self,
        task_id: i64,
        notification_type: NotificationType,
        day: NaiveDate,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("has_notification_log");
        let result: Result<(bool,), sqlx::Error> = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM notification_logs
                WHERE task_id = ?1 AND notification_type = ?2 AND log_date = ?3
            )
            "#,
        )
        .bind(task_id)
        .bind(notification_type)
        .bind(day)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(|(exists,)| exists)
    }

    /// Newest first.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<NotificationLogEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_notification_logs");
        let sql = format!(
            r#"
            SELECT {LOG_COLUMNS}
            FROM notification_logs
            WHERE user_id = ?1 AND (?2 = 0 OR is_read = 0)
            ORDER BY sent_at DESC, id DESC
            LIMIT ?3
            "#
        );
        let result = sqlx::query_as::<_, NotificationLogEntity>(&sql)
            .bind(user_id)
            .bind(unread_only)
            .bind(limit)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Dismisses one of the user's notifications.
    pub async fn mark_read(&self, id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("mark_notification_read");
        let result = sqlx::query("UPDATE notification_logs SET is_read = 1 WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    pub async fn mark_all_read(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("mark_all_notifications_read");
        let result = sqlx::query("UPDATE notification_logs SET is_read = 1 WHERE user_id = ?1 AND is_read = 0")
            .bind(user_id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    pub async fn schedule(
        &self,
        task_id: i64,
        user_id: i64,
        notification_type: NotificationType,
        scheduled_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<ScheduledNotificationEntity, sqlx::Error> {
        let timer = QueryTimer::new("schedule_notification");
        let sql = format!(
            r#"
            INSERT INTO scheduled_notifications (task_id, user_id, notification_type, scheduled_at,
                                                 status, created_at)
            VALUES (?1, ?2, ?3, ?4, 'pending', ?5)
            RETURNING {SCHEDULED_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, ScheduledNotificationEntity>(&sql)
            .bind(task_id)
            .bind(user_id)
            .bind(notification_type)
            .bind(scheduled_at)
            .bind(now)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Pending rows scheduled at or before `now`, oldest first.
    pub async fn due_pending(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ScheduledNotificationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("due_scheduled_notifications");
        let sql = format!(
            r#"
            SELECT {SCHEDULED_COLUMNS}
            FROM scheduled_notifications
            WHERE status = 'pending' AND scheduled_at <= ?1
            ORDER BY scheduled_at, id
            LIMIT ?2
            "#
        );
        let result = sqlx::query_as::<_, ScheduledNotificationEntity>(&sql)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Records the outcome of processing a scheduled row.
    pub async fn mark_scheduled(
        &self,
        id: i64,
        status: ScheduledStatus,
        error_message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("mark_scheduled_notification");
        let result = sqlx::query(
            r#"
            UPDATE scheduled_notifications
            SET status = ?2, error_message = ?3, processed_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(error_message)
        .bind(now)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }

    /// Cancels every pending row of a task.
    pub async fn cancel_pending_for_task(
        &self,
        task_id: i64,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("cancel_scheduled_notifications");
        let result = sqlx::query(
            r#"
            UPDATE scheduled_notifications
            SET status = 'cancelled', processed_at = ?2
            WHERE task_id = ?1 AND status = 'pending'
            "#,
        )
        .bind(task_id)
        .bind(now)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    pub async fn get_settings(
        &self,
        user_id: i64,
    ) -> Result<Option<NotificationSettingsEntity>, sqlx::Error> {
        let timer = QueryTimer::new("get_notification_settings");
        let result = sqlx::query_as::<_, NotificationSettingsEntity>(
            r#"
            SELECT user_id, email_enabled, reminder_days_before, daily_summary_enabled
            FROM user_notification_settings
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn upsert_settings(
        &self,
        settings: &NotificationSettings,
        now: DateTime<Utc>,
    ) -> Result<NotificationSettingsEntity, sqlx::Error> {
        let timer = QueryTimer::new("upsert_notification_settings");
        let result = sqlx::query_as::<_, NotificationSettingsEntity>(
            r#"
            INSERT INTO user_notification_settings
                (user_id, email_enabled, reminder_days_before, daily_summary_enabled, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id) DO UPDATE SET
                email_enabled = excluded.email_enabled,
                reminder_days_before = excluded.reminder_days_before,
                daily_summary_enabled = excluded.daily_summary_enabled,
                updated_at = excluded.updated_at
            RETURNING user_id, email_enabled, reminder_days_before, daily_summary_enabled
            "#,
        )
        .bind(settings.user_id)
        .bind(settings.email_enabled)
        .bind(settings.reminder_days_before)
        .bind(settings.daily_summary_enabled)
        .bind(now)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::repositories::TaskRepository;
    use chrono::Duration;
    use domain::models::task::{NewTask, TaskPriority, TaskStatus, TaskType};

    async fn setup() -> (NotificationRepository, i64) {
        let pool = create_memory_pool().await.unwrap();
        let task = TaskRepository::new(pool.clone())
            .insert(
                &NewTask {
                    title: "離職票".into(),
                    description: None,
                    client_id: None,
                    project_id: None,
                    assignee_id: None,
                    created_by: 1,
                    priority: TaskPriority::High,
                    task_type: TaskType::Procedure,
                    status: TaskStatus::Pending,
                    due_date: None,
                    calendar_event_id: None,
                    gmail_message_id: None,
                },
                Utc::now(),
            )
            .await
            .unwrap();
        (NotificationRepository::new(pool), task.id)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn overdue(task_id: i64, log_date: NaiveDate) -> NewNotificationLog<'static> {
        NewNotificationLog {
            user_id: 1,
            notification_type: NotificationType::TaskOverdue,
            task_id: Some(task_id),
            message: Some("期限超過"),
            log_date,
        }
    }

    #[tokio::test]
    async fn test_overdue_log_once_per_day() {
        let (repo, task_id) = setup().await;
        let now = Utc::now();

        assert!(repo.insert_log(&overdue(task_id, day(10)), now).await.unwrap());
        assert!(!repo.insert_log(&overdue(task_id, day(10)), now).await.unwrap());
        assert!(repo.insert_log(&overdue(task_id, day(11)), now).await.unwrap());

        assert!(repo
            .has_log_on(task_id, NotificationType::TaskOverdue, day(10))
            .await
            .unwrap());
        assert!(!repo
            .has_log_on(task_id, NotificationType::TaskReminder, day(10))
            .await
            .unwrap());

        let reminder = NewNotificationLog {
            notification_type: NotificationType::TaskReminder,
            ..overdue(task_id, day(10))
        };
        assert!(repo.insert_log(&reminder, now).await.unwrap());
        assert!(repo.insert_log(&reminder, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_and_mark_read() {
        let (repo, task_id) = setup().await;
        let now = Utc::now();
        repo.insert_log(&overdue(task_id, day(10)), now).await.unwrap();
        repo.insert_log(&overdue(task_id, day(11)), now + Duration::seconds(1))
            .await
            .unwrap();

        let all = repo.list_for_user(1, false, 50).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].sent_at >= all[1].sent_at);

        assert!(repo.mark_read(all[0].id, 1).await.unwrap());
        assert!(!repo.mark_read(all[0].id, 2).await.unwrap());
        assert_eq!(repo.list_for_user(1, true, 50).await.unwrap().len(), 1);

        assert_eq!(repo.mark_all_read(1).await.unwrap(), 1);
        assert!(repo.list_for_user(1, true, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scheduled_lifecycle() {
        let (repo, task_id) = setup().await;
        let now = Utc::now();

        let due = repo
            .schedule(task_id, 1, NotificationType::TaskReminder, now - Duration::hours(1), now)
            .await
            .unwrap();
        repo.schedule(task_id, 1, NotificationType::TaskReminder, now + Duration::days(1), now)
            .await
            .unwrap();
        assert_eq!(due.status, ScheduledStatus::Pending);

        let pending = repo.due_pending(now, 100).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, due.id);

        repo.mark_scheduled(due.id, ScheduledStatus::Failed, Some("smtp down"), now)
            .await
            .unwrap();
        assert!(repo.due_pending(now, 100).await.unwrap().is_empty());

        assert_eq!(repo.cancel_pending_for_task(task_id, now).await.unwrap(), 1);
        assert!(repo
            .due_pending(now + Duration::days(2), 100)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_settings_upsert() {
        let (repo, _) = setup().await;
        assert!(repo.get_settings(5).await.unwrap().is_none());

        let mut settings = NotificationSettings::defaults_for(5, 1);
        settings.reminder_days_before = 3;
        repo.upsert_settings(&settings, Utc::now()).await.unwrap();

        settings.email_enabled = false;
        let stored = repo.upsert_settings(&settings, Utc::now()).await.unwrap();
        assert!(!stored.email_enabled);
        assert_eq!(stored.reminder_days_before, 3);
        assert_eq!(repo.get_settings(5).await.unwrap().unwrap().user_id, 5);
    }
}

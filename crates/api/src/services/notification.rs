//! Task reminder, overdue and daily-summary delivery.
//!
//! Days are office-local: "today" and due dates are evaluated in the
//! configured time zone. Periodic work runs once per external trigger.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use domain::models::notification::{
    NotificationLog, NotificationSettings, NotificationType, OverdueReport, ScheduledNotification,
    ScheduledReport, ScheduledStatus, UpdateNotificationSettingsRequest,
};
use domain::models::task::{Task, TaskDetail};
use domain::services::notification::{
    compose_daily_summary, compose_overdue_notice, compose_task_reminder, EmailContent,
    EmailSender,
};
use persistence::repositories::{
    NewNotificationLog, NotificationRepository, TaskRepository, UserRepository,
};
use persistence::SqlitePool;
use tracing::{debug, error, info, warn};

use crate::error::ApiError;
use crate::middleware::metrics::record_notification;

/// What happened to a single notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    /// Nothing to send; the reason is for logs and responses.
    Skipped(&'static str),
    Failed(String),
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent)
    }
}

/// Who receives a task notification.
#[derive(Debug, Clone)]
struct Recipient {
    user_id: i64,
    name: String,
    email: Option<String>,
}

#[derive(Clone)]
pub struct NotificationService {
    tasks: TaskRepository,
    users: UserRepository,
    notifications: NotificationRepository,
    email: Arc<dyn EmailSender>,
    time_zone: Tz,
    default_reminder_days: i64,
    batch_size: i64,
}

impl NotificationService {
    pub fn new(
        pool: SqlitePool,
        email: Arc<dyn EmailSender>,
        time_zone: Tz,
        default_reminder_days: i64,
        batch_size: i64,
    ) -> Self {
        Self {
            tasks: TaskRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            notifications: NotificationRepository::new(pool),
            email,
            time_zone,
            default_reminder_days,
            batch_size,
        }
    }

    /// Office-local wall-clock time.
    pub fn local_now(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.time_zone).naive_local()
    }

    pub fn local_today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_now(now).date()
    }

    fn to_utc(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.time_zone
            .from_local_datetime(&local)
            .earliest()
            .map(|d| d.with_timezone(&Utc))
    }

    /// Assignee, or the owner when the task is unassigned.
    async fn recipient(&self, detail: &TaskDetail) -> Result<Option<Recipient>, ApiError> {
        if let Some(assignee_id) = detail.task.assignee_id {
            return Ok(Some(Recipient {
                user_id: assignee_id,
                name: detail.assignee_name.clone().unwrap_or_default(),
                email: detail.assignee_email.clone(),
            }));
        }

        Ok(self
            .users
            .find_by_id(detail.task.created_by)
            .await?
            .map(|user| Recipient {
                user_id: user.id,
                name: user.name,
                email: user.email,
            }))
    }

    // --- settings ---

    pub async fn settings(&self, user_id: i64) -> Result<NotificationSettings, ApiError> {
        Ok(self
            .notifications
            .get_settings(user_id)
            .await?
            .map(Into::into)
            .unwrap_or_else(|| {
                NotificationSettings::defaults_for(user_id, self.default_reminder_days)
            }))
    }

    pub async fn update_settings(
        &self,
        user_id: i64,
        request: &UpdateNotificationSettingsRequest,
        now: DateTime<Utc>,
    ) -> Result<NotificationSettings, ApiError> {
        let updated = request.apply_to(self.settings(user_id).await?);
        Ok(self.notifications.upsert_settings(&updated, now).await?.into())
    }

    // --- in-app list ---

    pub async fn list_for_user(
        &self,
        user_id: i64,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<NotificationLog>, ApiError> {
        let rows = self
            .notifications
            .list_for_user(user_id, unread_only, limit.clamp(1, 200))
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn mark_read(&self, user_id: i64, id: i64) -> Result<(), ApiError> {
        if self.notifications.mark_read(id, user_id).await? {
            Ok(())
        } else {
            Err(ApiError::NotFound(format!("Notification {} not found", id)))
        }
    }

    pub async fn mark_all_read(&self, user_id: i64) -> Result<u64, ApiError> {
        Ok(self.notifications.mark_all_read(user_id).await?)
    }

    // --- delivery ---

    async fn deliver(&self, kind: &'static str, email: &EmailContent) -> Result<(), String> {
        match self.email.send(email).await {
            Ok(()) => {
                record_notification(kind, true);
                Ok(())
            }
            Err(e) => {
                record_notification(kind, false);
                Err(e.to_string())
            }
        }
    }

    /// Sends a reminder for one task.
    ///
    /// Only a successful send is logged, so a failed reminder can be sent
    /// again on the next attempt.
    pub async fn send_task_reminder(
        &self,
        task_id: i64,
        now: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, ApiError> {
        let Some(detail) = self.tasks.find_detail(task_id).await? else {
            return Ok(DeliveryOutcome::Skipped("task not found"));
        };
        let detail: TaskDetail = detail.into();
        if detail.task.is_completed() {
            return Ok(DeliveryOutcome::Skipped("task already completed"));
        }

        let Some(recipient) = self.recipient(&detail).await? else {
            return Ok(DeliveryOutcome::Skipped("no recipient"));
        };
        let Some(address) = recipient.email.as_deref() else {
            return Ok(DeliveryOutcome::Skipped("recipient has no email address"));
        };
        if !self.settings(recipient.user_id).await?.email_enabled {
            return Ok(DeliveryOutcome::Skipped("email notifications disabled"));
        }

        let today = self.local_today(now);
        let email = compose_task_reminder(&detail, &recipient.name, address, today);

        if let Err(e) = self.deliver("task_reminder", &email).await {
            error!(task_id, to = %address, error = %e, "Task reminder failed");
            return Ok(DeliveryOutcome::Failed(e));
        }

        self.notifications
            .insert_log(
                &NewNotificationLog {
                    user_id: recipient.user_id,
                    notification_type: NotificationType::TaskReminder,
                    task_id: Some(task_id),
                    message: Some(&email.subject),
                    log_date: today,
                },
                now,
            )
            .await?;

        info!(task_id, user_id = recipient.user_id, "Task reminder sent");
        Ok(DeliveryOutcome::Sent)
    }

    /// Sends one overdue notice per open task due before today.
    ///
    /// The day's log row is claimed before sending, so a task gets at most
    /// one notice attempt per day even when sweeps overlap. The row stays
    /// whether or not the send succeeds.
    pub async fn notify_overdue_tasks(&self, now: DateTime<Utc>) -> Result<OverdueReport, ApiError> {
        let today = self.local_today(now);
        let start_of_today = today.and_time(NaiveTime::MIN);
        let overdue = self
            .tasks
            .find_overdue_unnotified(start_of_today, today)
            .await?;

        let mut report = OverdueReport {
            checked: overdue.len(),
            ..Default::default()
        };

        for entity in overdue {
            let detail: TaskDetail = entity.into();
            let task_id = detail.task.id;

            let recipient = match self.recipient(&detail).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(task_id, error = %e, "Could not resolve overdue recipient");
                    report.send_failures += 1;
                    continue;
                }
            };
            let user_id = recipient
                .as_ref()
                .map(|r| r.user_id)
                .unwrap_or(detail.task.created_by);

            let subject = format!("【期限超過】{}", detail.task.title);
            let claimed = self
                .notifications
                .insert_log(
                    &NewNotificationLog {
                        user_id,
                        notification_type: NotificationType::TaskOverdue,
                        task_id: Some(task_id),
                        message: Some(&subject),
                        log_date: today,
                    },
                    now,
                )
                .await;

            match claimed {
                Ok(true) => {}
                Ok(false) => {
                    debug!(task_id, "Overdue notice already logged today");
                    continue;
                }
                Err(e) => {
                    warn!(task_id, error = %e, "Could not log overdue notice");
                    report.send_failures += 1;
                    continue;
                }
            }

            let Some((name, address)) = recipient.and_then(|r| Some((r.name, r.email?))) else {
                warn!(task_id, "Overdue task has no recipient address");
                report.send_failures += 1;
                continue;
            };

            let email = compose_overdue_notice(&detail, &name, &address, today);
            match self.deliver("task_overdue", &email).await {
                Ok(()) => report.notified += 1,
                Err(e) => {
                    warn!(task_id, to = %address, error = %e, "Overdue notice failed");
                    report.send_failures += 1;
                }
            }
        }

        info!(
            checked = report.checked,
            notified = report.notified,
            failures = report.send_failures,
            "Overdue sweep finished"
        );
        Ok(report)
    }

    /// One e-mail listing the user's tasks due today; nothing when there
    /// are none.
    pub async fn send_daily_summary(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, ApiError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("User {} not found", user_id)))?;

        let today = self.local_today(now);
        let from = today.and_time(NaiveTime::MIN);
        let tasks: Vec<TaskDetail> = self
            .tasks
            .find_due_for_user(user_id, from, from + Duration::days(1))
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        if tasks.is_empty() {
            return Ok(DeliveryOutcome::Skipped("no tasks due today"));
        }
        let Some(address) = user.email.as_deref() else {
            return Ok(DeliveryOutcome::Skipped("user has no email address"));
        };
        let settings = self.settings(user_id).await?;
        if !settings.email_enabled || !settings.daily_summary_enabled {
            return Ok(DeliveryOutcome::Skipped("daily summary disabled"));
        }

        let email = compose_daily_summary(&user.name, address, today, &tasks);
        if let Err(e) = self.deliver("daily_summary", &email).await {
            error!(user_id, error = %e, "Daily summary failed");
            return Ok(DeliveryOutcome::Failed(e));
        }

        self.notifications
            .insert_log(
                &NewNotificationLog {
                    user_id,
                    notification_type: NotificationType::DailySummary,
                    task_id: None,
                    message: Some(&email.subject),
                    log_date: today,
                },
                now,
            )
            .await?;

        info!(user_id, tasks = tasks.len(), "Daily summary sent");
        Ok(DeliveryOutcome::Sent)
    }

    /// Queues a reminder ahead of the task's due time, using the
    /// recipient's lead time. Nothing is queued for tasks without a due
    /// date or whose reminder time has already passed.
    pub async fn schedule_task_reminder(
        &self,
        task: &Task,
        now: DateTime<Utc>,
    ) -> Result<Option<ScheduledNotification>, ApiError> {
        let Some(due) = task.due_date else {
            return Ok(None);
        };
        let user_id = task.assignee_id.unwrap_or(task.created_by);
        let lead_days = self.settings(user_id).await?.reminder_days_before;

        let Some(remind_at) = self.to_utc(due - Duration::days(lead_days)) else {
            return Ok(None);
        };
        if remind_at <= now {
            debug!(task_id = task.id, "Reminder time already passed, not scheduling");
            return Ok(None);
        }

        let scheduled = self
            .notifications
            .schedule(task.id, user_id, NotificationType::TaskReminder, remind_at, now)
            .await?;
        debug!(task_id = task.id, scheduled_at = %remind_at, "Reminder scheduled");
        Ok(Some(scheduled.into()))
    }

    pub async fn cancel_task_reminders(&self, task_id: i64, now: DateTime<Utc>) -> Result<u64, ApiError> {
        Ok(self.notifications.cancel_pending_for_task(task_id, now).await?)
    }

    /// Delivers pending scheduled notifications that are due.
    pub async fn process_scheduled_notifications(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ScheduledReport, ApiError> {
        let due = self.notifications.due_pending(now, self.batch_size).await?;
        let mut report = ScheduledReport::default();

        for item in due {
            report.processed += 1;
            let outcome = match item.notification_type {
                NotificationType::TaskReminder | NotificationType::TaskOverdue => {
                    self.send_task_reminder(item.task_id, now).await
                }
                NotificationType::DailySummary => self.send_daily_summary(item.user_id, now).await,
            };

            let (status, error_message) = match outcome {
                Ok(DeliveryOutcome::Sent) => {
                    report.sent += 1;
                    (ScheduledStatus::Sent, None)
                }
                Ok(DeliveryOutcome::Skipped(reason)) => {
                    (ScheduledStatus::Cancelled, Some(reason.to_string()))
                }
                Ok(DeliveryOutcome::Failed(e)) => {
                    report.failed += 1;
                    (ScheduledStatus::Failed, Some(e))
                }
                Err(e) => {
                    report.failed += 1;
                    (ScheduledStatus::Failed, Some(e.to_string()))
                }
            };

            if let Err(e) = self
                .notifications
                .mark_scheduled(item.id, status, error_message.as_deref(), now)
                .await
            {
                warn!(scheduled_id = item.id, error = %e, "Could not update scheduled notification");
            }
        }

        info!(
            processed = report.processed,
            sent = report.sent,
            failed = report.failed,
            "Scheduled notifications processed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::task::{NewTask, TaskPriority, TaskStatus, TaskType};
    use domain::services::MockEmailSender;

    struct Fixture {
        service: NotificationService,
        sender: Arc<MockEmailSender>,
        tasks: TaskRepository,
        user_id: i64,
        pool: SqlitePool,
    }

    async fn fixture(sender: MockEmailSender) -> Fixture {
        let pool = persistence::db::create_memory_pool().await.unwrap();
        let user = UserRepository::new(pool.clone())
            .insert("山田", Some("yamada@example.com"), "staff")
            .await
            .unwrap();
        let sender = Arc::new(sender);
        let service = NotificationService::new(
            pool.clone(),
            sender.clone(),
            chrono_tz::Asia::Tokyo,
            1,
            50,
        );
        Fixture {
            service,
            sender,
            tasks: TaskRepository::new(pool.clone()),
            user_id: user.id,
            pool,
        }
    }

    fn new_task(owner: i64, due: Option<NaiveDateTime>) -> NewTask {
        NewTask {
            title: "離職票の作成".into(),
            description: None,
            client_id: None,
            project_id: None,
            assignee_id: Some(owner),
            created_by: owner,
            priority: TaskPriority::High,
            task_type: TaskType::Procedure,
            status: TaskStatus::Pending,
            due_date: due,
            calendar_event_id: None,
            gmail_message_id: None,
        }
    }

    async fn log_count(pool: &SqlitePool, kind: &str) -> i64 {
        let (n,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notification_logs WHERE notification_type = ?1")
                .bind(kind)
                .fetch_one(pool)
                .await
                .unwrap();
        n
    }

    #[tokio::test]
    async fn test_overdue_sweep_is_idempotent_per_day() {
        let f = fixture(MockEmailSender::new()).await;
        let now = Utc::now();
        let due = f.service.local_now(now) - Duration::days(3);
        f.tasks.insert(&new_task(f.user_id, Some(due)), now).await.unwrap();

        let first = f.service.notify_overdue_tasks(now).await.unwrap();
        assert_eq!(first.checked, 1);
        assert_eq!(first.notified, 1);

        let second = f.service.notify_overdue_tasks(now).await.unwrap();
        assert_eq!(second.checked, 0);
        assert_eq!(f.sender.attempts(), 1);
        assert_eq!(log_count(&f.pool, "task_overdue").await, 1);
    }

    #[tokio::test]
    async fn test_overdue_logged_even_when_send_fails() {
        let f = fixture(MockEmailSender::failing()).await;
        let now = Utc::now();
        let due = f.service.local_now(now) - Duration::days(1);
        f.tasks.insert(&new_task(f.user_id, Some(due)), now).await.unwrap();

        let report = f.service.notify_overdue_tasks(now).await.unwrap();
        assert_eq!(report.send_failures, 1);
        assert_eq!(log_count(&f.pool, "task_overdue").await, 1);

        f.service.notify_overdue_tasks(now).await.unwrap();
        assert_eq!(f.sender.attempts(), 1);
    }

    #[tokio::test]
    async fn test_task_due_today_is_not_overdue() {
        let f = fixture(MockEmailSender::new()).await;
        let now = Utc::now();
        let due = f.service.local_today(now).and_hms_opt(23, 59, 0).unwrap();
        f.tasks.insert(&new_task(f.user_id, Some(due)), now).await.unwrap();

        let report = f.service.notify_overdue_tasks(now).await.unwrap();
        assert_eq!(report.checked, 0);
    }

    #[tokio::test]
    async fn test_failed_reminder_is_not_logged() {
        let f = fixture(MockEmailSender::failing()).await;
        let now = Utc::now();
        let due = f.service.local_now(now) + Duration::days(2);
        let task = f.tasks.insert(&new_task(f.user_id, Some(due)), now).await.unwrap();

        let outcome = f.service.send_task_reminder(task.id, now).await.unwrap();
        assert!(matches!(outcome, DeliveryOutcome::Failed(_)));
        assert_eq!(log_count(&f.pool, "task_reminder").await, 0);
    }

    #[tokio::test]
    async fn test_reminder_sent_and_logged() {
        let f = fixture(MockEmailSender::new()).await;
        let now = Utc::now();
        let due = f.service.local_now(now) + Duration::days(2);
        let task = f.tasks.insert(&new_task(f.user_id, Some(due)), now).await.unwrap();

        let outcome = f.service.send_task_reminder(task.id, now).await.unwrap();
        assert!(outcome.is_sent());
        assert_eq!(f.sender.sent()[0].to, "yamada@example.com");
        assert_eq!(log_count(&f.pool, "task_reminder").await, 1);

        let missing = f.service.send_task_reminder(9999, now).await.unwrap();
        assert_eq!(missing, DeliveryOutcome::Skipped("task not found"));
    }

    #[tokio::test]
    async fn test_reminder_respects_disabled_email() {
        let f = fixture(MockEmailSender::new()).await;
        let now = Utc::now();
        f.service
            .update_settings(
                f.user_id,
                &UpdateNotificationSettingsRequest {
                    email_enabled: Some(false),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap();

        let due = f.service.local_now(now) + Duration::days(2);
        let task = f.tasks.insert(&new_task(f.user_id, Some(due)), now).await.unwrap();
        let outcome = f.service.send_task_reminder(task.id, now).await.unwrap();
        assert!(matches!(outcome, DeliveryOutcome::Skipped(_)));
        assert_eq!(f.sender.attempts(), 0);
    }

    #[tokio::test]
    async fn test_daily_summary() {
        let f = fixture(MockEmailSender::new()).await;
        let now = Utc::now();

        let nothing = f.service.send_daily_summary(f.user_id, now).await.unwrap();
        assert_eq!(nothing, DeliveryOutcome::Skipped("no tasks due today"));

        let due = f.service.local_today(now).and_hms_opt(23, 0, 0).unwrap();
        f.tasks.insert(&new_task(f.user_id, Some(due)), now).await.unwrap();
        let outcome = f.service.send_daily_summary(f.user_id, now).await.unwrap();
        assert!(outcome.is_sent());
        assert!(f.sender.sent()[0].subject.contains("1件"));
    }

    #[tokio::test]
    async fn test_scheduled_reminders_are_processed() {
        let f = fixture(MockEmailSender::new()).await;
        let now = Utc::now();
        let due = f.service.local_now(now) + Duration::days(3);
        let task: Task = f
            .tasks
            .insert(&new_task(f.user_id, Some(due)), now)
            .await
            .unwrap()
            .into();

        let scheduled = f
            .service
            .schedule_task_reminder(&task, now)
            .await
            .unwrap()
            .unwrap();
        assert!(scheduled.scheduled_at > now);

        let early = f.service.process_scheduled_notifications(now).await.unwrap();
        assert_eq!(early.processed, 0);

        let later = now + Duration::days(3);
        let report = f.service.process_scheduled_notifications(later).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.sent, 1);

        let again = f.service.process_scheduled_notifications(later).await.unwrap();
        assert_eq!(again.processed, 0);
    }

    #[tokio::test]
    async fn test_schedule_skips_past_reminders() {
        let f = fixture(MockEmailSender::new()).await;
        let now = Utc::now();
        let due = f.service.local_now(now) + Duration::hours(2);
        let task: Task = f
            .tasks
            .insert(&new_task(f.user_id, Some(due)), now)
            .await
            .unwrap()
            .into();
        assert!(f.service.schedule_task_reminder(&task, now).await.unwrap().is_none());
    }
}

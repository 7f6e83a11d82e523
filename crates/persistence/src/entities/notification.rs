//! Notification entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::notification::{
    NotificationLog, NotificationSettings, NotificationType, ScheduledNotification,
    ScheduledStatus,
};
use sqlx::FromRow;

/// Database row mapping for the notification_logs table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationLogEntity {
    pub id: i64,
    pub user_id: i64,
    pub notification_type: NotificationType,
    pub task_id: Option<i64>,
    pub message: Option<String>,
    pub is_read: bool,
    pub sent_at: DateTime<Utc>,
}

impl From<NotificationLogEntity> for NotificationLog {
    fn from(entity: NotificationLogEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            notification_type: entity.notification_type,
            task_id: entity.task_id,
            message: entity.message,
            is_read: entity.is_read,
            sent_at: entity.sent_at,
        }
    }
}

/// Database row mapping for the scheduled_notifications table.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduledNotificationEntity {
    pub id: i64,
    pub task_id: i64,
    pub user_id: i64,
    pub notification_type: NotificationType,
    pub scheduled_at: DateTime<Utc>,
    pub status: ScheduledStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ScheduledNotificationEntity> for ScheduledNotification {
    fn from(entity: ScheduledNotificationEntity) -> Self {
        Self {
            id: entity.id,
            task_id: entity.task_id,
            user_id: entity.user_id,
            notification_type: entity.notification_type,
            scheduled_at: entity.scheduled_at,
            status: entity.status,
            processed_at: entity.processed_at,
            error_message: entity.error_message,
            created_at: entity.created_at,
        }
    }
}

/// Database row mapping for the user_notification_settings table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationSettingsEntity {
    pub user_id: i64,
    pub email_enabled: bool,
    pub reminder_days_before: i64,
    pub daily_summary_enabled: bool,
}

impl From<NotificationSettingsEntity> for NotificationSettings {
    fn from(entity: NotificationSettingsEntity) -> Self {
        Self {
            user_id: entity.user_id,
            email_enabled: entity.email_enabled,
            reminder_days_before: entity.reminder_days_before,
            daily_summary_enabled: entity.daily_summary_enabled,
        }
    }
}

//! Notification log, scheduled notification and settings models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Kind of notification recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum NotificationType {
    TaskReminder,
    TaskOverdue,
    DailySummary,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::TaskReminder => write!(f, "task_reminder"),
            NotificationType::TaskOverdue => write!(f, "task_overdue"),
            NotificationType::DailySummary => write!(f, "daily_summary"),
        }
    }
}

/// Append-only record of a notification that was produced for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationLog {
    pub id: i64,
    pub user_id: i64,
    pub notification_type: NotificationType,
    pub task_id: Option<i64>,
    pub message: Option<String>,
    /// Dismissed by the user in the in-app list.
    pub is_read: bool,
    pub sent_at: DateTime<Utc>,
}

/// Delivery state of a scheduled notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ScheduledStatus {
    Pending,
    Sent,
    Failed,
    Cancelled,
}

/// A notification queued for a future instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScheduledNotification {
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

/// Per-user notification preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationSettings {
    pub user_id: i64,
    pub email_enabled: bool,
    pub reminder_days_before: i64,
    pub daily_summary_enabled: bool,
}

impl NotificationSettings {
    /// Settings applied when the user never saved any.
    pub fn defaults_for(user_id: i64, reminder_days_before: i64) -> Self {
        Self {
            user_id,
            email_enabled: true,
            reminder_days_before,
            daily_summary_enabled: true,
        }
    }
}

/// Request payload for saving notification settings (partial update).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateNotificationSettingsRequest {
    pub email_enabled: Option<bool>,

    #[validate(range(min = 0, max = 30, message = "Reminder lead time must be 0-30 days"))]
    pub reminder_days_before: Option<i64>,

    pub daily_summary_enabled: Option<bool>,
}

impl UpdateNotificationSettingsRequest {
    /// Applies the provided fields on top of `current`.
    pub fn apply_to(&self, current: NotificationSettings) -> NotificationSettings {
        NotificationSettings {
            user_id: current.user_id,
            email_enabled: self.email_enabled.unwrap_or(current.email_enabled),
            reminder_days_before: self
                .reminder_days_before
                .unwrap_or(current.reminder_days_before),
            daily_summary_enabled: self
                .daily_summary_enabled
                .unwrap_or(current.daily_summary_enabled),
        }
    }
}

/// Query parameters for the in-app notification list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListNotificationsQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
}

/// Outcome of an overdue sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct OverdueReport {
    pub checked: usize,
    pub notified: usize,
    pub send_failures: usize,
}

/// Outcome of processing due scheduled notifications.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ScheduledReport {
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
}

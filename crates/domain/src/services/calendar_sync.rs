//! Mapping between tasks and external calendar events.

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

use crate::models::calendar::{
    CalendarEvent, EventDateTime, EventPayload, EventReminders, ReminderOverride,
};
use crate::models::task::{NewTask, TaskDetail, TaskPriority, TaskStatus, TaskType};

/// Marker put in front of event titles created from tasks.
pub const TASK_MARKER: &str = "[タスク]";

/// Prefix put in front of the title of a completed task's event.
pub const COMPLETED_PREFIX: &str = "✅ [完了]";

/// Title used when an imported event has no usable summary.
pub const UNTITLED_EVENT: &str = "(無題の予定)";

const EVENT_LENGTH_MINUTES: i64 = 60;
const WALL_CLOCK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CalendarSyncError {
    #[error("Task {0} has no due date")]
    MissingDueDate(i64),

    #[error("Event {0} has no start time")]
    MissingStart(String),
}

/// Provider color id for a task priority.
pub fn priority_color(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::Urgent | TaskPriority::High => "11",
        TaskPriority::Medium => "5",
        TaskPriority::Low => "10",
    }
}

/// Reminder overrides attached to task events: e-mail a day ahead and a
/// popup an hour ahead.
pub fn task_reminders() -> EventReminders {
    EventReminders {
        use_default: false,
        overrides: vec![
            ReminderOverride {
                method: "email".to_string(),
                minutes: 24 * 60,
            },
            ReminderOverride {
                method: "popup".to_string(),
                minutes: 60,
            },
        ],
    }
}

fn wall_clock(at: NaiveDateTime, time_zone: &str) -> EventDateTime {
    EventDateTime {
        date_time: Some(at.format(WALL_CLOCK_FORMAT).to_string()),
        date: None,
        time_zone: Some(time_zone.to_string()),
    }
}

/// Event description listing the task's context, one line per field.
pub fn task_event_description(detail: &TaskDetail) -> String {
    let task = &detail.task;
    let mut lines = vec![
        format!("クライアント: {}", detail.client_name.as_deref().unwrap_or("未設定")),
        format!("担当者: {}", detail.assignee_name.as_deref().unwrap_or("未割当")),
        format!("優先度: {}", task.priority.label()),
        format!("種別: {}", task.task_type.label()),
    ];
    if let Some(description) = task.description.as_deref().filter(|d| !d.trim().is_empty()) {
        lines.push(String::new());
        lines.push(format!("詳細: {}", description));
    }
    lines.join("\n")
}

/// Builds the event for a task: a one-hour slot starting at the due time,
/// in the office time zone.
pub fn build_task_event(
    detail: &TaskDetail,
    time_zone: &str,
) -> Result<EventPayload, CalendarSyncError> {
    let due = detail
        .task
        .due_date
        .ok_or(CalendarSyncError::MissingDueDate(detail.task.id))?;

    Ok(EventPayload {
        summary: Some(format!("{} {}", TASK_MARKER, detail.task.title)),
        description: Some(task_event_description(detail)),
        location: None,
        start: Some(wall_clock(due, time_zone)),
        end: Some(wall_clock(
            due + Duration::minutes(EVENT_LENGTH_MINUTES),
            time_zone,
        )),
        color_id: Some(priority_color(detail.task.priority).to_string()),
        reminders: Some(task_reminders()),
    })
}

/// Event title for a completed task.
pub fn completed_summary(title: &str) -> String {
    format!("{} {}", COMPLETED_PREFIX, title)
}

/// Whether the event was created from (or for) a task.
pub fn is_task_event(event: &CalendarEvent) -> bool {
    event
        .summary
        .as_deref()
        .map_or(false, |s| s.contains(TASK_MARKER))
}

/// Task title recovered from an event summary.
pub fn strip_task_marker(summary: &str) -> String {
    let title = summary.trim();
    let title = title.strip_prefix(COMPLETED_PREFIX).unwrap_or(title).trim_start();
    let title = title.strip_prefix(TASK_MARKER).unwrap_or(title);
    title.trim().to_string()
}

/// Due time of an imported event: the timed start in its own wall-clock
/// time, or midnight for all-day events.
pub fn due_from_event(event: &CalendarEvent) -> Option<NaiveDateTime> {
    let start = event.start.as_ref()?;
    start
        .date_time
        .as_deref()
        .or(start.date.as_deref())
        .and_then(shared::validation::parse_due_date)
}

/// Builds a task owned by `user_id` from an external event.
///
/// Events without a usable start are rejected rather than defaulted.
pub fn new_task_from_event(
    event: &CalendarEvent,
    user_id: i64,
) -> Result<NewTask, CalendarSyncError> {
    let due_date =
        due_from_event(event).ok_or_else(|| CalendarSyncError::MissingStart(event.id.clone()))?;

    let title = event
        .summary
        .as_deref()
        .map(strip_task_marker)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED_EVENT.to_string());

    Ok(NewTask {
        title,
        description: event.description.clone(),
        client_id: None,
        project_id: None,
        assignee_id: None,
        created_by: user_id,
        priority: TaskPriority::Medium,
        task_type: TaskType::Other,
        status: TaskStatus::Pending,
        due_date: Some(due_date),
        calendar_event_id: Some(event.id.clone()),
        gmail_message_id: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::Task;
    use chrono::{NaiveDate, Timelike, Utc};

    fn detail(due: Option<NaiveDateTime>, priority: TaskPriority) -> TaskDetail {
        TaskDetail {
            task: Task {
                id: 9,
                title: "年末調整".to_string(),
                description: Some("源泉徴収票の作成".to_string()),
                client_id: Some(1),
                project_id: None,
                assignee_id: Some(2),
                created_by: 2,
                priority,
                task_type: TaskType::Payroll,
                status: TaskStatus::Pending,
                progress: 0,
                due_date: due,
                calendar_event_id: None,
                gmail_message_id: None,
                completed_at: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            client_name: Some("ABC社".to_string()),
            assignee_name: Some("山田".to_string()),
            assignee_email: None,
        }
    }

    fn due() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 12, 31)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_build_task_event() {
        let payload = build_task_event(&detail(Some(due()), TaskPriority::High), "Asia/Tokyo").unwrap();

        assert_eq!(payload.summary.as_deref(), Some("[タスク] 年末調整"));
        let start = payload.start.unwrap();
        let end = payload.end.unwrap();
        assert_eq!(start.date_time.as_deref(), Some("2024-12-31T10:00:00"));
        assert_eq!(end.date_time.as_deref(), Some("2024-12-31T11:00:00"));
        assert_eq!(start.time_zone.as_deref(), Some("Asia/Tokyo"));
        assert_eq!(payload.color_id.as_deref(), Some("11"));

        let description = payload.description.unwrap();
        assert!(description.contains("クライアント: ABC社"));
        assert!(description.contains("担当者: 山田"));
        assert!(description.contains("優先度: 高"));
        assert!(description.contains("種別: 給与計算"));
        assert!(description.contains("詳細: 源泉徴収票の作成"));

        let reminders = payload.reminders.unwrap();
        assert!(!reminders.use_default);
        assert_eq!(reminders.overrides.len(), 2);
    }

    #[test]
    fn test_build_task_event_requires_due_date() {
        let err = build_task_event(&detail(None, TaskPriority::Low), "Asia/Tokyo").unwrap_err();
        assert_eq!(err, CalendarSyncError::MissingDueDate(9));
    }

    #[test]
    fn test_event_crossing_midnight() {
        let late = NaiveDate::from_ymd_opt(2024, 12, 31)
            .unwrap()
            .and_hms_opt(23, 30, 0)
            .unwrap();
        let payload = build_task_event(&detail(Some(late), TaskPriority::Low), "Asia/Tokyo").unwrap();
        assert_eq!(
            payload.end.unwrap().date_time.as_deref(),
            Some("2025-01-01T00:30:00")
        );
    }

    #[test]
    fn test_priority_colors() {
        assert_eq!(priority_color(TaskPriority::Urgent), "11");
        assert_eq!(priority_color(TaskPriority::Medium), "5");
        assert_eq!(priority_color(TaskPriority::Low), "10");
    }

    #[test]
    fn test_strip_task_marker() {
        assert_eq!(strip_task_marker("[タスク] 算定基礎届"), "算定基礎届");
        assert_eq!(strip_task_marker("✅ [完了] [タスク] 算定基礎届"), "算定基礎届");
        assert_eq!(strip_task_marker("打合せ"), "打合せ");
    }

    #[test]
    fn test_due_from_event_variants() {
        let timed = CalendarEvent {
            id: "e1".into(),
            start: Some(EventDateTime {
                date_time: Some("2025-06-10T09:00:00+09:00".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(due_from_event(&timed).unwrap().hour(), 9);

        let all_day = CalendarEvent {
            id: "e2".into(),
            start: Some(EventDateTime {
                date: Some("2025-06-10".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(due_from_event(&all_day).unwrap().hour(), 0);

        assert!(due_from_event(&CalendarEvent::default()).is_none());
    }

    #[test]
    fn test_new_task_from_event() {
        let event = CalendarEvent {
            id: "evt9".into(),
            summary: Some("[タスク] 労働保険の年度更新".into()),
            description: Some("申告書を作成".into()),
            start: Some(EventDateTime {
                date_time: Some("2025-06-10T09:00:00+09:00".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let task = new_task_from_event(&event, 4).unwrap();
        assert_eq!(task.title, "労働保険の年度更新");
        assert_eq!(task.created_by, 4);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.task_type, TaskType::Other);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.calendar_event_id.as_deref(), Some("evt9"));
    }

    #[test]
    fn test_new_task_from_event_without_start() {
        let event = CalendarEvent {
            id: "evt0".into(),
            summary: Some("[タスク] x".into()),
            ..Default::default()
        };
        assert_eq!(
            new_task_from_event(&event, 1).unwrap_err(),
            CalendarSyncError::MissingStart("evt0".into())
        );
    }

    #[test]
    fn test_is_task_event() {
        let event = CalendarEvent {
            summary: Some("✅ [完了] [タスク] x".into()),
            ..Default::default()
        };
        assert!(is_task_event(&event));
        assert!(!is_task_event(&CalendarEvent::default()));
    }
}

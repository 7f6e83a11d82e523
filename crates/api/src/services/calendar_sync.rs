//! Two-way synchronization between tasks and calendar events.
//!
//! The calendar holds the event content; a task only keeps the event id.
//! Batch syncs run item by item and never stop on a single failure.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use domain::models::calendar::{CalendarEvent, EventPayload, ListEventsQuery, SyncReport};
use domain::models::task::{Task, TaskDetail};
use domain::services::calendar_sync::{
    build_task_event, completed_summary, is_task_event, new_task_from_event, TASK_MARKER,
};
use persistence::repositories::TaskRepository;
use persistence::SqlitePool;
use tracing::{debug, error, info, warn};

use crate::error::ApiError;
use crate::middleware::metrics::record_task_import;
use crate::services::google::{CalendarApi, GoogleClient};

#[derive(Clone)]
pub struct CalendarSyncService {
    tasks: TaskRepository,
    google: GoogleClient,
}

impl CalendarSyncService {
    pub fn new(pool: SqlitePool, google: GoogleClient) -> Self {
        Self {
            tasks: TaskRepository::new(pool),
            google,
        }
    }

    async fn task_detail(&self, task_id: i64) -> Result<TaskDetail, ApiError> {
        self.tasks
            .find_detail(task_id)
            .await?
            .map(Into::into)
            .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", task_id)))
    }

    /// Creates the event for a task and stores its id on the task.
    ///
    /// Does not check for an existing link; callers that must not duplicate
    /// events filter on `calendar_event_id` first.
    pub async fn sync_task_to_calendar(
        &self,
        user_id: i64,
        task_id: i64,
        now: DateTime<Utc>,
    ) -> Result<CalendarEvent, ApiError> {
        let detail = self.task_detail(task_id).await?;
        let calendar = self.google.calendar(user_id).await?;
        self.push_task(&calendar, &detail, now).await
    }

    async fn push_task(
        &self,
        calendar: &CalendarApi,
        detail: &TaskDetail,
        now: DateTime<Utc>,
    ) -> Result<CalendarEvent, ApiError> {
        let payload = build_task_event(detail, &self.google.config().time_zone)?;
        let event = calendar.insert_event(&payload).await?;
        let task_id = detail.task.id;

        let linked = self
            .tasks
            .set_calendar_event_id(task_id, &event.id, now)
            .await;

        match linked {
            Ok(true) => {
                info!(task_id, event_id = %event.id, "Task synced to calendar");
                Ok(event)
            }
            Ok(false) => {
                self.discard_orphan(calendar, &event.id, task_id).await;
                Err(ApiError::NotFound(format!("Task {} not found", task_id)))
            }
            Err(e) => {
                self.discard_orphan(calendar, &event.id, task_id).await;
                Err(e.into())
            }
        }
    }

    /// Best-effort removal of an event whose task link could not be stored.
    async fn discard_orphan(&self, calendar: &CalendarApi, event_id: &str, task_id: i64) {
        match calendar.delete_event(event_id).await {
            Ok(()) => warn!(task_id, event_id, "Removed calendar event after failed task link"),
            Err(e) => error!(
                task_id,
                event_id,
                error = %e,
                "Calendar event left orphaned after failed task link"
            ),
        }
    }

    /// Imports one calendar event as a new task owned by `user_id`.
    pub async fn create_task_from_event(
        &self,
        user_id: i64,
        event_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Task, ApiError> {
        if self.tasks.exists_with_calendar_event(event_id).await? {
            return Err(ApiError::Conflict(format!(
                "Event {} is already linked to a task",
                event_id
            )));
        }

        let calendar = self.google.calendar(user_id).await?;
        let event = calendar.get_event(event_id).await?;
        self.import_event(&event, user_id, now).await
    }

    async fn import_event(
        &self,
        event: &CalendarEvent,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Task, ApiError> {
        let new_task = new_task_from_event(event, user_id)?;
        let task: Task = self.tasks.insert(&new_task, now).await?.into();
        info!(task_id = task.id, event_id = %event.id, "Task created from calendar event");
        Ok(task)
    }

    /// Marks the linked event as done. Returns false when the task has no
    /// event.
    pub async fn update_calendar_on_task_complete(
        &self,
        user_id: i64,
        task: &Task,
    ) -> Result<bool, ApiError> {
        let Some(event_id) = task.calendar_event_id.as_deref() else {
            return Ok(false);
        };

        let calendar = self.google.calendar(user_id).await?;
        calendar
            .patch_event(event_id, &EventPayload::rename(completed_summary(&task.title)))
            .await?;
        debug!(task_id = task.id, event_id, "Calendar event marked completed");
        Ok(true)
    }

    /// Pushes unlinked open tasks to the calendar, then imports unlinked
    /// task events from the upcoming window.
    pub async fn full_sync(&self, user_id: i64, now: DateTime<Utc>) -> Result<SyncReport, ApiError> {
        let calendar = self.google.calendar(user_id).await?;
        let mut report = SyncReport::default();

        for task in self.tasks.find_unsynced_for_owner(user_id).await? {
            if task.due_date.is_none() {
                debug!(task_id = task.id, "Skipping task without due date");
                report.skipped += 1;
                continue;
            }

            let result = match self.tasks.find_detail(task.id).await {
                Ok(Some(detail)) => self.push_task(&calendar, &detail.into(), now).await,
                Ok(None) => continue,
                Err(e) => Err(e.into()),
            };

            match result {
                Ok(_) => report.synced_to_calendar += 1,
                Err(e) => {
                    warn!(task_id = task.id, error = %e, "Task sync failed");
                    report.failed += 1;
                    report.errors.push(format!("task {}: {}", task.id, e));
                }
            }
        }

        let window_end = now + Duration::days(self.google.config().sync_window_days);
        let events = calendar
            .list_events(&ListEventsQuery {
                time_min: Some(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
                time_max: Some(window_end.to_rfc3339_opts(SecondsFormat::Secs, true)),
                q: Some(TASK_MARKER.to_string()),
                max_results: None,
            })
            .await?;

        for event in events.iter().filter(|e| is_task_event(e) && !e.id.is_empty()) {
            let result = match self.tasks.exists_with_calendar_event(&event.id).await {
                Ok(true) => continue,
                Ok(false) => self.import_event(event, user_id, now).await,
                Err(e) => Err(e.into()),
            };

            match result {
                Ok(_) => report.synced_from_calendar += 1,
                Err(e) => {
                    warn!(event_id = %event.id, error = %e, "Event import failed");
                    report.failed += 1;
                    report.errors.push(format!("event {}: {}", event.id, e));
                }
            }
        }

        record_task_import("calendar", report.synced_from_calendar);
        info!(
            user_id,
            to_calendar = report.synced_to_calendar,
            from_calendar = report.synced_from_calendar,
            skipped = report.skipped,
            failed = report.failed,
            "Calendar full sync finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GoogleConfig;
    use chrono::NaiveDate;
    use domain::models::google::GoogleToken;
    use domain::models::task::{NewTask, TaskPriority, TaskStatus, TaskType};
    use persistence::repositories::UserRepository;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EVENTS_PATH: &str = "/calendars/primary/events";

    struct Fixture {
        service: CalendarSyncService,
        tasks: TaskRepository,
        user_id: i64,
    }

    async fn fixture(server: &MockServer) -> Fixture {
        let pool = persistence::db::create_memory_pool().await.unwrap();
        let user = UserRepository::new(pool.clone())
            .insert("山田", Some("yamada@example.com"), "staff")
            .await
            .unwrap();

        let config = GoogleConfig {
            calendar_base_url: server.uri(),
            calendar_id: "primary".into(),
            ..Default::default()
        };
        let google = GoogleClient::new(config, pool.clone()).unwrap();
        google
            .tokens()
            .put(
                user.id,
                &GoogleToken {
                    access_token: "token".into(),
                    expires_at: None,
                },
                Utc::now(),
            )
            .await
            .unwrap();

        Fixture {
            service: CalendarSyncService::new(pool.clone(), google),
            tasks: TaskRepository::new(pool),
            user_id: user.id,
        }
    }

    fn new_task(owner: i64, title: &str, due: bool) -> NewTask {
        NewTask {
            title: title.into(),
            description: None,
            client_id: None,
            project_id: None,
            assignee_id: None,
            created_by: owner,
            priority: TaskPriority::High,
            task_type: TaskType::Procedure,
            status: TaskStatus::Pending,
            due_date: due.then(|| {
                NaiveDate::from_ymd_opt(2030, 4, 1)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap()
            }),
            calendar_event_id: None,
            gmail_message_id: None,
        }
    }

    #[tokio::test]
    async fn test_full_sync_pushes_imports_and_deduplicates() {
        let server = MockServer::start().await;
        let f = fixture(&server).await;
        let now = Utc::now();

        let pushed = f.tasks.insert(&new_task(f.user_id, "算定基礎届", true), now).await.unwrap();
        f.tasks.insert(&new_task(f.user_id, "期限なし", false), now).await.unwrap();

        Mock::given(method("POST"))
            .and(path(EVENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "evt-pushed",
                "summary": "[タスク] 算定基礎届"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(EVENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "id": "evt-pushed", "summary": "[タスク] 算定基礎届",
                      "start": { "dateTime": "2030-04-01T10:00:00+09:00" } },
                    { "id": "evt-external", "summary": "[タスク] 労使協定の締結",
                      "start": { "dateTime": "2030-04-03T14:00:00+09:00" } },
                    { "id": "evt-meeting", "summary": "定例会議",
                      "start": { "dateTime": "2030-04-02T09:00:00+09:00" } }
                ]
            })))
            .mount(&server)
            .await;

        let report = f.service.full_sync(f.user_id, now).await.unwrap();
        assert_eq!(report.synced_to_calendar, 1);
        assert_eq!(report.synced_from_calendar, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);

        let linked = f.tasks.find_by_id(pushed.id).await.unwrap().unwrap();
        assert_eq!(linked.calendar_event_id.as_deref(), Some("evt-pushed"));
        assert!(f.tasks.exists_with_calendar_event("evt-external").await.unwrap());

        let again = f.service.full_sync(f.user_id, now).await.unwrap();
        assert_eq!(again.synced_to_calendar, 0);
        assert_eq!(again.synced_from_calendar, 0);
    }

    #[tokio::test]
    async fn test_full_sync_counts_event_without_start_as_failure() {
        let server = MockServer::start().await;
        let f = fixture(&server).await;

        Mock::given(method("GET"))
            .and(path(EVENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [ { "id": "evt-broken", "summary": "[タスク] 開始なし" } ]
            })))
            .mount(&server)
            .await;

        let report = f.service.full_sync(f.user_id, Utc::now()).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(!f.tasks.exists_with_calendar_event("evt-broken").await.unwrap());
    }

    #[tokio::test]
    async fn test_event_removed_when_task_link_cannot_be_stored() {
        let server = MockServer::start().await;
        let f = fixture(&server).await;
        let now = Utc::now();
        let task = f.tasks.insert(&new_task(f.user_id, "労働保険年度更新", true), now).await.unwrap();
        let detail: TaskDetail = f.tasks.find_detail(task.id).await.unwrap().unwrap().into();
        assert!(f.tasks.delete(task.id).await.unwrap());

        Mock::given(method("POST"))
            .and(path(EVENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "evt-orphan",
                "summary": "[タスク] 労働保険年度更新"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("{}/evt-orphan", EVENTS_PATH)))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let calendar = f.service.google.calendar(f.user_id).await.unwrap();
        let err = f.service.push_task(&calendar, &detail, now).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(!f.tasks.exists_with_calendar_event("evt-orphan").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_task_from_linked_event_conflicts() {
        let server = MockServer::start().await;
        let f = fixture(&server).await;
        let mut task = new_task(f.user_id, "年末調整", true);
        task.calendar_event_id = Some("evt-1".into());
        f.tasks.insert(&task, Utc::now()).await.unwrap();

        let err = f
            .service
            .create_task_from_event(f.user_id, "evt-1", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_sync_task_without_due_date_rejected() {
        let server = MockServer::start().await;
        let f = fixture(&server).await;
        let task = f.tasks.insert(&new_task(f.user_id, "期限なし", false), Utc::now()).await.unwrap();

        let err = f
            .service
            .sync_task_to_calendar(f.user_id, task.id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_completion_renames_linked_event() {
        let server = MockServer::start().await;
        let f = fixture(&server).await;
        let mut new = new_task(f.user_id, "年末調整", true);
        new.calendar_event_id = Some("evt-9".into());
        let task: Task = f.tasks.insert(&new, Utc::now()).await.unwrap().into();

        Mock::given(method("PATCH"))
            .and(path(format!("{}/evt-9", EVENTS_PATH)))
            .and(body_partial_json(json!({ "summary": "✅ [完了] 年末調整" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "evt-9" })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(f
            .service
            .update_calendar_on_task_complete(f.user_id, &task)
            .await
            .unwrap());

        let unlinked: Task = f
            .tasks
            .insert(&new_task(f.user_id, "未連携", true), Utc::now())
            .await
            .unwrap()
            .into();
        assert!(!f
            .service
            .update_calendar_on_task_complete(f.user_id, &unlinked)
            .await
            .unwrap());
    }
}

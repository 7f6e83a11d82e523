//! Task repository for database operations.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use domain::models::task::{NewTask, TaskPriority, TaskStatus, TaskType};
use sqlx::SqlitePool;

use crate::entities::task::{TASK_COLUMNS, TASK_FIELDS};
use crate::entities::{TaskDetailEntity, TaskEntity};
use crate::metrics::QueryTimer;

const DETAIL_JOINS: &str = "FROM tasks t \
     LEFT JOIN clients c ON c.id = t.client_id \
     LEFT JOIN users u ON u.id = t.assignee_id";

const DETAIL_EXTRA_COLUMNS: &str =
    "c.name AS client_name, u.name AS assignee_name, u.email AS assignee_email";

/// Filters for task listings. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<i64>,
    pub client_id: Option<i64>,
    pub project_id: Option<i64>,
    pub due_from: Option<NaiveDateTime>,
    pub due_to: Option<NaiveDateTime>,
}

const FILTER_CLAUSE: &str = r#"
    (?1 IS NULL OR t.status = ?1)
    AND (?2 IS NULL OR t.assignee_id = ?2)
    AND (?3 IS NULL OR t.client_id = ?3)
    AND (?4 IS NULL OR t.project_id = ?4)
    AND (?5 IS NULL OR t.due_date >= ?5)
    AND (?6 IS NULL OR t.due_date <= ?6)
"#;

/// Fields changed by a task edit. Unset fields keep their value.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub client_id: Option<i64>,
    pub project_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub priority: Option<TaskPriority>,
    pub task_type: Option<TaskType>,
    pub due_date: Option<NaiveDateTime>,
    pub progress: Option<i64>,
}

/// Repository for task-related database operations.
#[derive(Clone)]
pub struct TaskRepository {
    pool: SqlitePool,
}

impl TaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn insert(&self, task: &NewTask, now: DateTime<Utc>) -> Result<TaskEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_task");
        let sql = format!(
            r#"
            INSERT INTO tasks (title, description, client_id, project_id, assignee_id, created_by,
                               priority, task_type, status, due_date, calendar_event_id,
                               gmail_message_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            RETURNING {TASK_FIELDS}
            "#
        );
        let result = sqlx::query_as::<_, TaskEntity>(&sql)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.client_id)
            .bind(task.project_id)
            .bind(task.assignee_id)
            .bind(task.created_by)
            .bind(task.priority)
            .bind(task.task_type)
            .bind(task.status)
            .bind(task.due_date)
            .bind(&task.calendar_event_id)
            .bind(&task.gmail_message_id)
            .bind(now)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<TaskEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_task_by_id");
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?1");
        let result = sqlx::query_as::<_, TaskEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// A task with its client and assignee names.
    pub async fn find_detail(&self, id: i64) -> Result<Option<TaskDetailEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_task_detail");
        let sql = format!(
            "SELECT {TASK_COLUMNS}, {DETAIL_EXTRA_COLUMNS} {DETAIL_JOINS} WHERE t.id = ?1"
        );
        let result = sqlx::query_as::<_, TaskDetailEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Lists tasks by due date (undated last), then id.
    pub async fn list(
        &self,
        filter: &TaskFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TaskDetailEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_tasks");
        let sql = format!(
            r#"
            SELECT {TASK_COLUMNS}, {DETAIL_EXTRA_COLUMNS}
            {DETAIL_JOINS}
            WHERE {FILTER_CLAUSE}
            ORDER BY t.due_date IS NULL, t.due_date, t.id
            LIMIT ?7 OFFSET ?8
            "#
        );
        let result = sqlx::query_as::<_, TaskDetailEntity>(&sql)
            .bind(filter.status)
            .bind(filter.assignee_id)
            .bind(filter.client_id)
            .bind(filter.project_id)
            .bind(filter.due_from)
            .bind(filter.due_to)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn count(&self, filter: &TaskFilter) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_tasks");
        let sql = format!("SELECT COUNT(*) FROM tasks t WHERE {FILTER_CLAUSE}");
        let count: (i64,) = sqlx::query_as(&sql)
            .bind(filter.status)
            .bind(filter.assignee_id)
            .bind(filter.client_id)
            .bind(filter.project_id)
            .bind(filter.due_from)
            .bind(filter.due_to)
            .fetch_one(&self.pool)
            .await?;
        timer.record();
        Ok(count.0)
    }

    pub async fn update(
        &self,
        id: i64,
        changes: &TaskChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<TaskEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_task");
        let sql = format!(
            r#"
            UPDATE tasks SET
                title = COALESCE(?2, title),
                description = COALESCE(?3, description),
                client_id = COALESCE(?4, client_id),
                project_id = COALESCE(?5, project_id),
                assignee_id = COALESCE(?6, assignee_id),
                priority = COALESCE(?7, priority),
                task_type = COALESCE(?8, task_type),
                due_date = COALESCE(?9, due_date),
                progress = COALESCE(?10, progress),
                updated_at = ?11
            WHERE id = ?1
            RETURNING {TASK_FIELDS}
            "#
        );
        let result = sqlx::query_as::<_, TaskEntity>(&sql)
            .bind(id)
            .bind(&changes.title)
            .bind(&changes.description)
            .bind(changes.client_id)
            .bind(changes.project_id)
            .bind(changes.assignee_id)
            .bind(changes.priority)
            .bind(changes.task_type)
            .bind(changes.due_date)
            .bind(changes.progress)
            .bind(now)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Sets the status. Completing stamps `completed_at` and full progress;
    /// leaving `completed` clears the stamp.
    pub async fn update_status(
        &self,
        id: i64,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<TaskEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_task_status");
        let completed = status == TaskStatus::Completed;
        let sql = format!(
            r#"
            UPDATE tasks SET
                status = ?2,
                completed_at = CASE WHEN ?3 THEN COALESCE(completed_at, ?4) ELSE NULL END,
                progress = CASE WHEN ?3 THEN 100 ELSE progress END,
                updated_at = ?4
            WHERE id = ?1
            RETURNING {TASK_FIELDS}
            "#
        );
        let result = sqlx::query_as::<_, TaskEntity>(&sql)
            .bind(id)
            .bind(status)
            .bind(completed)
            .bind(now)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_task");
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_calendar_event_id(
        &self,
        id: i64,
        event_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("set_task_calendar_event");
        let result = sqlx::query("UPDATE tasks SET calendar_event_id = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(event_id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Open tasks owned by `user_id` that have no calendar event yet.
    pub async fn find_unsynced_for_owner(&self, user_id: i64) -> Result<Vec<TaskEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_unsynced_tasks");
        let sql = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks t
            WHERE t.created_by = ?1
              AND t.calendar_event_id IS NULL
              AND t.status <> 'completed'
            ORDER BY t.id
            "#
        );
        let result = sqlx::query_as::<_, TaskEntity>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Whether any task references the calendar event.
    pub async fn exists_with_calendar_event(&self, event_id: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("task_exists_with_calendar_event");
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM tasks WHERE calendar_event_id = ?1)")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await?;
        timer.record();
        Ok(exists)
    }

    pub async fn find_by_gmail_message_id(
        &self,
        message_id: &str,
    ) -> Result<Option<TaskEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_task_by_gmail_message");
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.gmail_message_id = ?1");
        let result = sqlx::query_as::<_, TaskEntity>(&sql)
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Open tasks due before `before` with no overdue notice logged on `day`.
    pub async fn find_overdue_unnotified(
        &self,
        before: NaiveDateTime,
        day: NaiveDate,
    ) -> Result<Vec<TaskDetailEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_overdue_unnotified_tasks");
        let sql = format!(
            r#"
            SELECT {TASK_COLUMNS}, {DETAIL_EXTRA_COLUMNS}
            {DETAIL_JOINS}
            WHERE t.due_date IS NOT NULL
              AND t.due_date < ?1
              AND t.status <> 'completed'
              AND NOT EXISTS (
                  SELECT 1 FROM notification_logs n
                  WHERE n.task_id = t.id
                    AND n.notification_type = 'task_overdue'
                    AND n.log_date = ?2
              )
            ORDER BY t.due_date, t.id
            "#
        );
        let result = sqlx::query_as::<_, TaskDetailEntity>(&sql)
            .bind(before)
            .bind(day)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Open tasks due in `[from, to)` that belong to the user: assigned to
    /// them, or unassigned and created by them.
    pub async fn find_due_for_user(
        &self,
        user_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<TaskDetailEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_tasks_due_for_user");
        let sql = format!(
            r#"
            SELECT {TASK_COLUMNS}, {DETAIL_EXTRA_COLUMNS}
            {DETAIL_JOINS}
            WHERE (t.assignee_id = ?1 OR (t.assignee_id IS NULL AND t.created_by = ?1))
              AND t.status <> 'completed'
              AND t.due_date >= ?2
              AND t.due_date < ?3
            ORDER BY t.due_date, t.id
            "#
        );
        let result = sqlx::query_as::<_, TaskDetailEntity>(&sql)
            .bind(user_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::repositories::UserRepository;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn new_task(title: &str, owner: i64, due: Option<NaiveDateTime>) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            client_id: None,
            project_id: None,
            assignee_id: None,
            created_by: owner,
            priority: TaskPriority::Medium,
            task_type: TaskType::Other,
            status: TaskStatus::Pending,
            due_date: due,
            calendar_event_id: None,
            gmail_message_id: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_detail() {
        let pool = create_memory_pool().await.unwrap();
        let users = UserRepository::new(pool.clone());
        let user = users.insert("山田", Some("yamada@example.com"), "staff").await.unwrap();
        let repo = TaskRepository::new(pool);

        let mut task = new_task("算定基礎届", user.id, Some(at(2025, 7, 10, 10)));
        task.assignee_id = Some(user.id);
        let created = repo.insert(&task, Utc::now()).await.unwrap();
        assert_eq!(created.status, TaskStatus::Pending);
        assert_eq!(created.due_date, Some(at(2025, 7, 10, 10)));

        let detail = repo.find_detail(created.id).await.unwrap().unwrap();
        assert_eq!(detail.assignee_name.as_deref(), Some("山田"));
        assert_eq!(detail.assignee_email.as_deref(), Some("yamada@example.com"));
        assert!(detail.client_name.is_none());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let repo = TaskRepository::new(create_memory_pool().await.unwrap());
        let now = Utc::now();
        repo.insert(&new_task("a", 1, Some(at(2025, 1, 5, 9))), now).await.unwrap();
        let b = repo.insert(&new_task("b", 1, Some(at(2025, 1, 20, 9))), now).await.unwrap();
        repo.insert(&new_task("c", 1, None), now).await.unwrap();
        repo.update_status(b.id, TaskStatus::InProgress, now).await.unwrap();

        let all = repo.list(&TaskFilter::default(), 50, 0).await.unwrap();
        let titles: Vec<_> = all.iter().map(|t| t.task.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);

        let filter = TaskFilter {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        };
        assert_eq!(repo.count(&filter).await.unwrap(), 1);

        let filter = TaskFilter {
            due_from: Some(at(2025, 1, 10, 0)),
            due_to: Some(at(2025, 1, 31, 23)),
            ..Default::default()
        };
        let ranged = repo.list(&filter, 50, 0).await.unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].task.title, "b");
    }

    #[tokio::test]
    async fn test_complete_and_reopen() {
        let repo = TaskRepository::new(create_memory_pool().await.unwrap());
        let now = Utc::now();
        let task = repo.insert(&new_task("a", 1, None), now).await.unwrap();

        let done = repo.update_status(task.id, TaskStatus::Completed, now).await.unwrap().unwrap();
        assert!(done.completed_at.is_some());
        assert_eq!(done.progress, 100);

        let reopened = repo.update_status(task.id, TaskStatus::Pending, now).await.unwrap().unwrap();
        assert!(reopened.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_unsynced_and_event_lookup() {
        let repo = TaskRepository::new(create_memory_pool().await.unwrap());
        let now = Utc::now();
        let a = repo.insert(&new_task("a", 1, Some(at(2025, 1, 5, 9))), now).await.unwrap();
        let b = repo.insert(&new_task("b", 1, Some(at(2025, 1, 6, 9))), now).await.unwrap();
        repo.insert(&new_task("other owner", 2, None), now).await.unwrap();
        repo.update_status(b.id, TaskStatus::Completed, now).await.unwrap();

        let unsynced = repo.find_unsynced_for_owner(1).await.unwrap();
        assert_eq!(unsynced.len(), 1);
        assert_eq!(unsynced[0].id, a.id);

        repo.set_calendar_event_id(a.id, "evt-1", now).await.unwrap();
        assert!(repo.exists_with_calendar_event("evt-1").await.unwrap());
        assert!(!repo.exists_with_calendar_event("evt-2").await.unwrap());
        assert!(repo.find_unsynced_for_owner(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_gmail_message_rejected() {
        let repo = TaskRepository::new(create_memory_pool().await.unwrap());
        let mut task = new_task("mail", 1, None);
        task.gmail_message_id = Some("msg-1".into());
        repo.insert(&task, Utc::now()).await.unwrap();

        let err = repo.insert(&task, Utc::now()).await.unwrap_err();
        assert!(err.as_database_error().map_or(false, |e| e.is_unique_violation()));
        assert!(repo.find_by_gmail_message_id("msg-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_due_for_user_scope() {
        let repo = TaskRepository::new(create_memory_pool().await.unwrap());
        let now = Utc::now();
        let mut assigned = new_task("assigned", 2, Some(at(2025, 3, 10, 10)));
        assigned.assignee_id = Some(1);
        repo.insert(&assigned, now).await.unwrap();
        repo.insert(&new_task("own", 1, Some(at(2025, 3, 10, 15))), now).await.unwrap();
        let mut someone_else = new_task("someone else", 1, Some(at(2025, 3, 10, 11)));
        someone_else.assignee_id = Some(3);
        repo.insert(&someone_else, now).await.unwrap();
        repo.insert(&new_task("tomorrow", 1, Some(at(2025, 3, 11, 9))), now).await.unwrap();

        let due = repo
            .find_due_for_user(1, at(2025, 3, 10, 0), at(2025, 3, 11, 0))
            .await
            .unwrap();
        let titles: Vec<_> = due.iter().map(|t| t.task.title.as_str()).collect();
        assert_eq!(titles, vec!["assigned", "own"]);
    }
}

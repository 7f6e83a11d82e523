//! E-mail notification composition and delivery abstraction.
//!
//! Builds reminder, overdue and daily-summary messages for tasks and
//! defines the [`EmailSender`] seam the api crate implements.

use std::sync::Mutex;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;

use crate::models::task::TaskDetail;

/// A composed outbound e-mail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailContent {
    pub to: String,
    pub subject: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Email delivery is disabled")]
    Disabled,

    #[error("Email provider rejected the message: {0}")]
    Rejected(String),

    #[error("Email transport error: {0}")]
    Transport(String),
}

/// Outbound e-mail delivery.
#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &EmailContent) -> Result<(), EmailError>;
}

/// Recording sender for development and testing.
///
/// Keeps every message it was asked to send and never talks to a provider.
#[derive(Debug, Default)]
pub struct MockEmailSender {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    sent: Mutex<Vec<EmailContent>>,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose every attempt fails (attempts are still recorded).
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Messages attempted so far.
    pub fn sent(&self) -> Vec<EmailContent> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn attempts(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl EmailSender for MockEmailSender {
    async fn send(&self, email: &EmailContent) -> Result<(), EmailError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }

        if self.simulate_failure {
            tracing::warn!(to = %email.to, "Mock email sender simulating failure");
            return Err(EmailError::Transport("Simulated failure".to_string()));
        }

        tracing::info!(to = %email.to, subject = %email.subject, "Mock: Would send email");
        Ok(())
    }
}

/// Calendar days from `today` to the due date (negative when past due).
pub fn days_until_due(due: NaiveDateTime, today: NaiveDate) -> i64 {
    (due.date() - today).num_days()
}

fn due_phrase(days: i64) -> String {
    match days {
        d if d < 0 => format!("期限を{}日過ぎています", -d),
        0 => "本日が期限です".to_string(),
        1 => "明日が期限です".to_string(),
        d => format!("期限まであと{}日です", d),
    }
}

fn task_lines(detail: &TaskDetail) -> Vec<String> {
    let task = &detail.task;
    let mut lines = vec![format!("タスク: {}", task.title)];
    if let Some(due) = task.due_date {
        lines.push(format!("期限: {}", due.format("%Y-%m-%d %H:%M")));
    }
    if let Some(client) = detail.client_name.as_deref() {
        lines.push(format!("クライアント: {}", client));
    }
    lines.push(format!("優先度: {}", task.priority.label()));
    if let Some(description) = task.description.as_deref().filter(|d| !d.trim().is_empty()) {
        lines.push(String::new());
        lines.push(description.to_string());
    }
    lines
}

fn greeting(recipient_name: &str) -> Vec<String> {
    match recipient_name.trim() {
        "" => Vec::new(),
        name => vec![format!("{} さん", name), String::new()],
    }
}

/// Reminder for an upcoming task.
pub fn compose_task_reminder(
    detail: &TaskDetail,
    recipient_name: &str,
    to: &str,
    today: NaiveDate,
) -> EmailContent {
    let phrase = detail
        .task
        .due_date
        .map(|due| due_phrase(days_until_due(due, today)))
        .unwrap_or_else(|| "期限は設定されていません".to_string());

    let mut body = greeting(recipient_name);
    body.extend([phrase.clone(), String::new()]);
    body.extend(task_lines(detail));

    EmailContent {
        to: to.to_string(),
        subject: format!("【リマインダー】{} ({})", detail.task.title, phrase),
        text: body.join("\n"),
        html: None,
    }
}

/// Notice for a task past its due date.
pub fn compose_overdue_notice(
    detail: &TaskDetail,
    recipient_name: &str,
    to: &str,
    today: NaiveDate,
) -> EmailContent {
    let overdue_days = detail
        .task
        .due_date
        .map(|due| -days_until_due(due, today))
        .unwrap_or(0)
        .max(1);

    let mut body = greeting(recipient_name);
    body.extend([
        format!("以下のタスクが期限を{}日過ぎています。", overdue_days),
        String::new(),
    ]);
    body.extend(task_lines(detail));

    EmailContent {
        to: to.to_string(),
        subject: format!("【期限超過】{}", detail.task.title),
        text: body.join("\n"),
        html: None,
    }
}

/// Aggregate of the tasks due today for one user.
pub fn compose_daily_summary(
    user_name: &str,
    to: &str,
    today: NaiveDate,
    tasks: &[TaskDetail],
) -> EmailContent {
    let mut text = vec![
        format!("{} さん", user_name),
        String::new(),
        format!("本日 ({}) 期限のタスクが{}件あります。", today.format("%Y-%m-%d"), tasks.len()),
        String::new(),
    ];
    let mut html = format!(
        "<p>{} さん</p><p>本日 ({}) 期限のタスクが{}件あります。</p><ul>",
        escape_html(user_name),
        today.format("%Y-%m-%d"),
        tasks.len()
    );

    for detail in tasks {
        let time = detail
            .task
            .due_date
            .map(|d| d.format("%H:%M").to_string())
            .unwrap_or_default();
        let client = detail
            .client_name
            .as_deref()
            .map(|c| format!(" ({})", c))
            .unwrap_or_default();
        text.push(format!("・{} {}{} [{}]", time, detail.task.title, client, detail.task.priority.label()));
        html.push_str(&format!(
            "<li>{} {}{} [{}]</li>",
            time,
            escape_html(&detail.task.title),
            escape_html(&client),
            detail.task.priority.label()
        ));
    }
    html.push_str("</ul>");

    EmailContent {
        to: to.to_string(),
        subject: format!("【本日のタスク】{}件 ({})", tasks.len(), today.format("%m/%d")),
        text: text.join("\n"),
        html: Some(html),
    }
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

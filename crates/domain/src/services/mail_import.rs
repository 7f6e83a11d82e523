//! Conversion of received e-mail into tasks.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::gmail::EmailMessage;
use crate::models::task::{NewTask, TaskPriority, TaskStatus, TaskType};

/// Title used for messages without a subject.
pub const NO_SUBJECT: &str = "(件名なし)";

/// Imported descriptions are cut at this many characters.
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

lazy_static! {
    static ref EMAIL_ADDRESS: Regex =
        Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").unwrap();

    /// Reply and forward prefixes, repeated.
    static ref SUBJECT_PREFIX: Regex =
        Regex::new(r"^(?i:(?:re|fw|fwd)\s*[:：]\s*)+").unwrap();
}

/// The bare address in a header such as `山田 太郎 <yamada@example.com>`.
pub fn extract_email_address(header: &str) -> Option<String> {
    EMAIL_ADDRESS
        .find(header)
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Subject without `Re:`/`Fwd:` prefixes.
pub fn clean_subject(subject: &str) -> String {
    SUBJECT_PREFIX.replace(subject.trim(), "").trim().to_string()
}

/// Search query for unread recent mail from one client address.
pub fn client_mail_query(address: &str, newer_than_days: u32) -> String {
    format!("from:{} is:unread newer_than:{}d", address, newer_than_days)
}

fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &value[..idx]),
        None => value.to_string(),
    }
}

/// Description of an imported task: sender, date and body (or snippet).
pub fn task_description(message: &EmailMessage) -> String {
    let mut lines = Vec::new();
    if let Some(from) = message.from.as_deref() {
        lines.push(format!("From: {}", from));
    }
    if let Some(date) = message.date.as_deref() {
        lines.push(format!("Date: {}", date));
    }

    let content = message
        .body
        .as_deref()
        .filter(|b| !b.trim().is_empty())
        .or(message.snippet.as_deref())
        .unwrap_or_default()
        .trim();

    if !content.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(truncate_chars(content, MAX_DESCRIPTION_CHARS));
    }

    lines.join("\n")
}

/// Builds a task owned by `user_id` from a received message.
pub fn new_task_from_email(
    message: &EmailMessage,
    user_id: i64,
    client_id: Option<i64>,
) -> NewTask {
    let title = message
        .subject
        .as_deref()
        .map(clean_subject)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| NO_SUBJECT.to_string());

    let description = task_description(message);

    NewTask {
        title: truncate_chars(&title, 200),
        description: (!description.is_empty()).then_some(description),
        client_id,
        project_id: None,
        assignee_id: None,
        created_by: user_id,
        priority: TaskPriority::Medium,
        task_type: if client_id.is_some() {
            TaskType::Consultation
        } else {
            TaskType::Other
        },
        status: TaskStatus::Pending,
        due_date: None,
        calendar_event_id: None,
        gmail_message_id: Some(message.id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(subject: Option<&str>, body: Option<&str>) -> EmailMessage {
        EmailMessage {
            id: "msg1".into(),
            thread_id: None,
            from: Some("ABC社 総務 <Soumu@ABC.example.co.jp>".into()),
            to: None,
            subject: subject.map(str::to_string),
            date: Some("Mon, 3 Mar 2025 10:00:00 +0900".into()),
            snippet: Some("スニペット".into()),
            body: body.map(str::to_string),
            label_ids: vec![],
            attachments: vec![],
        }
    }

    #[test]
    fn test_extract_email_address() {
        assert_eq!(
            extract_email_address("ABC社 総務 <Soumu@ABC.example.co.jp>").as_deref(),
            Some("soumu@abc.example.co.jp")
        );
        assert_eq!(extract_email_address("no address"), None);
    }

    #[test]
    fn test_clean_subject() {
        assert_eq!(clean_subject("Re: RE: Fwd: 入社手続きの件"), "入社手続きの件");
        assert_eq!(clean_subject("Re：給与"), "給与");
        assert_eq!(clean_subject("Report"), "Report");
    }

    #[test]
    fn test_new_task_from_email() {
        let task = new_task_from_email(&message(Some("Re: 入社手続き"), Some("よろしくお願いします")), 3, Some(8));
        assert_eq!(task.title, "入社手続き");
        assert_eq!(task.client_id, Some(8));
        assert_eq!(task.task_type, TaskType::Consultation);
        assert_eq!(task.gmail_message_id.as_deref(), Some("msg1"));
        let description = task.description.unwrap();
        assert!(description.starts_with("From: ABC社"));
        assert!(description.ends_with("よろしくお願いします"));
    }

    #[test]
    fn test_new_task_falls_back_to_snippet_and_placeholder() {
        let task = new_task_from_email(&message(None, Some("   ")), 3, None);
        assert_eq!(task.title, NO_SUBJECT);
        assert_eq!(task.task_type, TaskType::Other);
        assert!(task.description.unwrap().ends_with("スニペット"));
    }

    #[test]
    fn test_long_body_truncated() {
        let body = "あ".repeat(MAX_DESCRIPTION_CHARS + 10);
        let description = task_description(&message(Some("s"), Some(&body)));
        assert!(description.ends_with('…'));
    }

    #[test]
    fn test_client_mail_query() {
        assert_eq!(
            client_mail_query("a@example.com", 7),
            "from:a@example.com is:unread newer_than:7d"
        );
    }
}

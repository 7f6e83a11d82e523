//! External calendar event records.
//!
//! These mirror the provider's JSON resources. Every field the provider may
//! omit is optional, so callers validate what they need at the boundary
//! instead of assuming presence.

use serde::{Deserialize, Serialize};

/// Start or end of an event. Exactly one of `date_time` (timed event) or
/// `date` (all-day event) is normally set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// A single reminder override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventReminders {
    #[serde(default)]
    pub use_default: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<ReminderOverride>,
}

/// An event as returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default)]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminders: Option<EventReminders>,
}

/// Body sent when creating or patching an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminders: Option<EventReminders>,
}

impl EventPayload {
    /// A patch that only renames the event.
    pub fn rename(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            ..Default::default()
        }
    }
}

/// One page of an event listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<CalendarEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Query parameters for listing events.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListEventsQuery {
    /// RFC 3339 lower bound.
    pub time_min: Option<String>,
    /// RFC 3339 upper bound.
    pub time_max: Option<String>,
    /// Free-text search.
    pub q: Option<String>,
    pub max_results: Option<u32>,
}

/// Request payload for quick-add.
#[derive(Debug, Clone, Deserialize)]
pub struct QuickAddRequest {
    pub text: String,
}

/// Request payload for a free/busy query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FreeBusyRequest {
    pub time_min: String,
    pub time_max: String,
    /// Calendars to query; the configured calendar when empty.
    #[serde(default)]
    pub calendar_ids: Vec<String>,
}

/// A busy interval reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusyPeriod {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarBusy {
    #[serde(default)]
    pub busy: Vec<BusyPeriod>,
}

/// Provider free/busy response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeBusyResponse {
    #[serde(default)]
    pub calendars: std::collections::BTreeMap<String, CalendarBusy>,
}

/// Request payload for importing an event as a task.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ImportEventRequest {
    pub event_id: String,
}

/// Outcome of a two-way calendar sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SyncReport {
    pub synced_to_calendar: usize,
    pub synced_from_calendar: usize,
    /// Open tasks left out because they have no due date.
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tolerates_missing_fields() {
        let event: CalendarEvent = serde_json::from_str(r#"{ "id": "evt1" }"#).unwrap();
        assert_eq!(event.id, "evt1");
        assert!(event.summary.is_none());
        assert!(event.start.is_none());
    }

    #[test]
    fn test_event_reads_provider_field_names() {
        let json = r#"{
            "id": "evt2",
            "summary": "[タスク] 労働保険の年度更新",
            "start": { "dateTime": "2025-06-10T09:00:00+09:00", "timeZone": "Asia/Tokyo" },
            "end": { "dateTime": "2025-06-10T10:00:00+09:00" },
            "colorId": "11",
            "htmlLink": "https://calendar.example/evt2"
        }"#;
        let event: CalendarEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.color_id.as_deref(), Some("11"));
        let start = event.start.unwrap();
        assert_eq!(start.date_time.as_deref(), Some("2025-06-10T09:00:00+09:00"));
        assert_eq!(start.time_zone.as_deref(), Some("Asia/Tokyo"));
    }

    #[test]
    fn test_rename_payload_serializes_only_summary() {
        let json = serde_json::to_value(EventPayload::rename("done")).unwrap();
        assert_eq!(json, serde_json::json!({ "summary": "done" }));
    }
}

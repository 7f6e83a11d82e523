//! Calendar API: events, quick-add and free/busy.

use domain::models::calendar::{
    CalendarEvent, EventList, EventPayload, FreeBusyResponse, ListEventsQuery,
};
use reqwest::Method;
use serde_json::json;

use super::{endpoint, GoogleApiError, Session};

/// Upper bound on events fetched per listing.
pub const MAX_EVENTS: u32 = 250;

pub struct CalendarApi {
    session: Session,
    base_url: String,
    calendar_id: String,
}

impl CalendarApi {
    pub(crate) fn new(session: Session, base_url: &str, calendar_id: &str) -> Self {
        Self {
            session,
            base_url: base_url.to_string(),
            calendar_id: calendar_id.to_string(),
        }
    }

    fn events_url(&self, extra: &[&str]) -> Result<reqwest::Url, GoogleApiError> {
        let mut segments = vec!["calendars", self.calendar_id.as_str(), "events"];
        segments.extend_from_slice(extra);
        endpoint(&self.base_url, &segments)
    }

    /// Single (expanded) events ordered by start time.
    pub async fn list_events(
        &self,
        query: &ListEventsQuery,
    ) -> Result<Vec<CalendarEvent>, GoogleApiError> {
        let mut params: Vec<(&str, String)> = vec![
            ("singleEvents", "true".into()),
            ("orderBy", "startTime".into()),
            (
                "maxResults",
                query.max_results.unwrap_or(MAX_EVENTS).min(MAX_EVENTS).to_string(),
            ),
        ];
        if let Some(time_min) = &query.time_min {
            params.push(("timeMin", time_min.clone()));
        }
        if let Some(time_max) = &query.time_max {
            params.push(("timeMax", time_max.clone()));
        }
        if let Some(q) = &query.q {
            params.push(("q", q.clone()));
        }

        let request = self
            .session
            .request(Method::GET, self.events_url(&[])?)
            .query(&params);
        let list: EventList = self.session.json(request).await?;
        Ok(list.items)
    }

    pub async fn get_event(&self, event_id: &str) -> Result<CalendarEvent, GoogleApiError> {
        let request = self
            .session
            .request(Method::GET, self.events_url(&[event_id])?);
        self.session.json(request).await
    }

    pub async fn insert_event(&self, payload: &EventPayload) -> Result<CalendarEvent, GoogleApiError> {
        let request = self
            .session
            .request(Method::POST, self.events_url(&[])?)
            .json(payload);
        self.session.json(request).await
    }

    /// Partial update; absent fields are left untouched.
    pub async fn patch_event(
        &self,
        event_id: &str,
        payload: &EventPayload,
    ) -> Result<CalendarEvent, GoogleApiError> {
        let request = self
            .session
            .request(Method::PATCH, self.events_url(&[event_id])?)
            .json(payload);
        self.session.json(request).await
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<(), GoogleApiError> {
        let request = self
            .session
            .request(Method::DELETE, self.events_url(&[event_id])?);
        self.session.empty(request).await
    }

    /// Creates an event from a natural-language description.
    pub async fn quick_add(&self, text: &str) -> Result<CalendarEvent, GoogleApiError> {
        if text.trim().is_empty() {
            return Err(GoogleApiError::InvalidRequest("Quick-add text is required".into()));
        }
        let request = self
            .session
            .request(Method::POST, self.events_url(&["quickAdd"])?)
            .query(&[("text", text)]);
        self.session.json(request).await
    }

    /// Busy intervals for the given calendars (the configured one when empty).
    pub async fn free_busy(
        &self,
        time_min: &str,
        time_max: &str,
        time_zone: &str,
        calendar_ids: &[String],
    ) -> Result<FreeBusyResponse, GoogleApiError> {
        let items: Vec<_> = if calendar_ids.is_empty() {
            vec![json!({ "id": self.calendar_id })]
        } else {
            calendar_ids.iter().map(|id| json!({ "id": id })).collect()
        };

        let body = json!({
            "timeMin": time_min,
            "timeMax": time_max,
            "timeZone": time_zone,
            "items": items,
        });
        let request = self
            .session
            .request(Method::POST, endpoint(&self.base_url, &["freeBusy"])?)
            .json(&body);
        self.session.json(request).await
    }
}

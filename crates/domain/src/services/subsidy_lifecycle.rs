//! Subsidy application lifecycle rules.
//!
//! Pure functions for the status state machine, checklist-driven progress,
//! deadline alerts and outcome statistics. Persistence and orchestration
//! live in the api crate; everything here is deterministic given `now`.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::models::subsidy::SubsidyStatistics;
use crate::models::subsidy_application::{AlertLevel, ApplicationStatus, DeadlineAlert};

/// Alerts at or below this many days are `urgent`.
pub const URGENT_THRESHOLD_DAYS: i64 = 7;

const SECONDS_PER_DAY: i64 = 86_400;

lazy_static! {
    /// Leading bullet or enumeration marker on a requirements line.
    static ref BULLET_PREFIX: Regex =
        Regex::new(r"^(?:[・\-*•●○■□◆◇]+|\d+[.)．、]|[（(]\d+[)）])\s*").unwrap();
}

/// Errors raised by lifecycle rules.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubsidyError {
    #[error("Irregular status transition {from} -> {to}: {reason}")]
    IrregularTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
        reason: &'static str,
    },
}

/// Checks a status change against the lifecycle.
///
/// Returns `Ok` for regular moves (and for no-op moves to the same status).
/// Irregular moves are reported as an error; whether they are rejected or
/// only logged is the caller's decision.
pub fn validate_transition(
    from: ApplicationStatus,
    to: ApplicationStatus,
) -> Result<(), SubsidyError> {
    use crate::models::subsidy_application::ApplicationStatus::*;

    if from == to {
        return Ok(());
    }

    let irregular = |reason: &'static str| -> Result<(), SubsidyError> {
        Err(SubsidyError::IrregularTransition { from, to, reason })
    };

    if from.is_terminal() {
        return irregular("application is already closed");
    }

    match (from, to) {
        (f, t) if f.is_pre_submission() && (t.is_pre_submission() || t == Submitted) => Ok(()),
        (f, Cancelled) if f.is_pre_submission() => Ok(()),
        (_, Cancelled) => irregular("cannot cancel after submission"),
        (f, UnderReview | Approved | Rejected | Received) if f.is_pre_submission() => {
            irregular("application must be submitted first")
        }
        (Submitted, UnderReview | Approved | Rejected) => Ok(()),
        (UnderReview, Approved | Rejected) => Ok(()),
        (Approved, Received) => Ok(()),
        (_, Received) => irregular("only approved applications can be received"),
        _ => irregular("moves backwards in the lifecycle"),
    }
}

/// Rounded completion percentage; 0 when there are no items.
pub fn compute_progress(completed: i64, total: i64) -> i64 {
    rounded_percentage(completed, total)
}

/// Rounded success percentage; 0 when there are no applications.
pub fn success_rate(success_count: i64, application_count: i64) -> i64 {
    rounded_percentage(success_count, application_count)
}

fn rounded_percentage(part: i64, whole: i64) -> i64 {
    if whole <= 0 {
        return 0;
    }
    let part = part.clamp(0, whole);
    // round half up: (100 * part / whole) + 0.5
    (200 * part + whole) / (2 * whole)
}

/// Builds statistics from raw aggregates.
pub fn build_statistics(
    subsidy_id: Option<i64>,
    application_count: i64,
    success_count: i64,
    avg_received_amount: Option<f64>,
) -> SubsidyStatistics {
    SubsidyStatistics {
        subsidy_id,
        application_count,
        success_count,
        success_rate: success_rate(success_count, application_count),
        avg_received_amount,
    }
}

/// Derives checklist item names from a subsidy's free text.
///
/// One item per non-empty line of `required_documents`, then of
/// `requirements`. Bullets and enumeration markers are stripped and repeated
/// names are kept once.
pub fn checklist_items_from_text(
    required_documents: Option<&str>,
    requirements: Option<&str>,
) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for text in [required_documents, requirements].into_iter().flatten() {
        for line in text.lines() {
            let name = BULLET_PREFIX.replace(line.trim(), "").trim().to_string();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
    }

    names
}

/// Whole days until `deadline`, rounded up.
///
/// The deadline is taken as the start of that day in the office time zone.
/// Overdue deadlines give zero or negative values.
pub fn days_remaining(deadline: NaiveDate, now: DateTime<Utc>, tz: Tz) -> i64 {
    let local_midnight = deadline.and_time(NaiveTime::MIN);
    let deadline_at = tz
        .from_local_datetime(&local_midnight)
        .earliest()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|| local_midnight.and_utc());
    let seconds = (deadline_at - now).num_seconds();
    // ceil division for both signs
    -((-seconds).div_euclid(SECONDS_PER_DAY))
}

pub fn alert_level(days_remaining: i64) -> AlertLevel {
    if days_remaining < 0 {
        AlertLevel::Overdue
    } else if days_remaining <= URGENT_THRESHOLD_DAYS {
        AlertLevel::Urgent
    } else {
        AlertLevel::Warning
    }
}

/// An application considered for alerting.
#[derive(Debug, Clone)]
pub struct AlertCandidate {
    pub application_id: i64,
    pub subsidy_name: String,
    pub client_name: String,
    pub status: ApplicationStatus,
    pub deadline: Option<NaiveDate>,
}

/// Selects and orders deadline alerts.
///
/// Open applications whose deadline lies within `window_days` of `now`
/// (office-local days) are kept, overdue ones included. Most urgent first, ties by application id.
pub fn build_alerts(
    candidates: impl IntoIterator<Item = AlertCandidate>,
    now: DateTime<Utc>,
    tz: Tz,
    window_days: i64,
) -> Vec<DeadlineAlert> {
    let mut alerts: Vec<DeadlineAlert> = candidates
        .into_iter()
        .filter(|c| !c.status.is_closed_for_alerts())
        .filter_map(|c| {
            let deadline = c.deadline?;
            let days = days_remaining(deadline, now, tz);
            (days <= window_days).then(|| DeadlineAlert {
                application_id: c.application_id,
                subsidy_name: c.subsidy_name,
                client_name: c.client_name,
                status: c.status,
                deadline,
                days_remaining: days,
                level: alert_level(days),
            })
        })
        .collect();

    alerts.sort_by_key(|a| (a.days_remaining, a.application_id));
    alerts
}

/// Application number assigned on first submission, e.g. `SA-2025-00012`.
pub fn application_number(application_id: i64, submitted_at: DateTime<Utc>) -> String {
    format!("SA-{}-{:05}", submitted_at.year(), application_id)
}

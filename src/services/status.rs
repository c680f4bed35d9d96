use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A batch counts as expiring once its end is this close.
pub const EXPIRING_WINDOW_DAYS: i64 = 7;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Upcoming,
    Active,
    Expiring,
    Completed,
}

impl BatchStatus {
    pub const ALL: [BatchStatus; 4] = [
        BatchStatus::Upcoming,
        BatchStatus::Active,
        BatchStatus::Expiring,
        BatchStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Upcoming => "upcoming",
            BatchStatus::Active => "active",
            BatchStatus::Expiring => "expiring",
            BatchStatus::Completed => "completed",
        }
    }

    pub fn from_filter(raw: &str) -> Option<BatchStatus> {
        let raw = raw.trim();
        BatchStatus::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(raw))
    }
}

/// Accepts RFC 3339 timestamps, zone-less ISO timestamps (read as UTC)
/// and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::InvalidDate(raw.to_string()))
}

/// First matching rule wins: not started, already ended, ending within
/// the expiring window, otherwise active.
pub fn status_at(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> BatchStatus {
    if now < start {
        BatchStatus::Upcoming
    } else if now > end {
        BatchStatus::Completed
    } else if end - now <= TimeDelta::days(EXPIRING_WINDOW_DAYS) {
        BatchStatus::Expiring
    } else {
        BatchStatus::Active
    }
}

pub fn classify_batch(start: &str, end: &str, now: DateTime<Utc>) -> Result<BatchStatus, AppError> {
    Ok(status_at(parse_timestamp(start)?, parse_timestamp(end)?, now))
}

/// Whole days left until `end`, rounded up. Zero or less means the end
/// has been reached.
pub fn days_remaining_at(end: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (end - now).num_milliseconds();
    if millis > 0 {
        (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    } else {
        // truncation toward zero is the ceiling for negatives
        millis / MILLIS_PER_DAY
    }
}

pub fn days_remaining(end: &str, now: DateTime<Utc>) -> Result<i64, AppError> {
    Ok(days_remaining_at(parse_timestamp(end)?, now))
}

pub fn validity_label(days_remaining: i64) -> String {
    if days_remaining <= 0 {
        "Expired".to_string()
    } else {
        format!("{} days", days_remaining)
    }
}

pub fn is_expiring_soon(days_remaining: i64) -> bool {
    days_remaining > 0 && days_remaining <= EXPIRING_WINDOW_DAYS
}

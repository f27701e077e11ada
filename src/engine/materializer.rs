//! Solution materialization: anchor-relative minutes → absolute timestamps.
//!
//! Offset 0 maps to the anchor, the caller-supplied instant (or now) rounded
//! down to the minute. Every solved task is written in one transaction.

use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};

use super::error::{EngineError, Result};
use crate::models::Schedule;
use crate::store::{Placement, ShopStore};

/// Rounds down to the whole minute.
pub fn truncate_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Parses a caller-supplied anchor.
///
/// Accepts `YYYY-MM-DDTHH:MM:SS` (a trailing fractional part is discarded;
/// read as UTC) and RFC 3339 with any offset.
pub fn parse_anchor(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let whole_seconds = raw.split('.').next().unwrap_or(raw);
    NaiveDateTime::parse_from_str(whole_seconds, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| {
            EngineError::Validation(format!(
                "Invalid start time format: '{raw}'. Expected YYYY-MM-DDTHH:MM:SS"
            ))
        })
}

/// The solve anchor: `raw` if given and non-blank, else `now`; rounded down
/// to the minute.
pub fn resolve_anchor(raw: Option<&str>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let anchor = match raw.filter(|r| !r.trim().is_empty()) {
        Some(raw) => parse_anchor(raw)?,
        None => now,
    };
    Ok(truncate_to_minute(anchor))
}

/// Absolute times for every assignment.
pub fn placements(anchor: DateTime<Utc>, schedule: &Schedule) -> Vec<Placement> {
    schedule
        .assignments
        .iter()
        .map(|a| Placement {
            task_id: a.task_id,
            start: anchor + Duration::minutes(a.start_offset),
            end: anchor + Duration::minutes(a.end_offset),
        })
        .collect()
}

/// Persists the schedule, all tasks or none. Returns the number written.
pub async fn materialize<S: ShopStore>(
    store: &S,
    anchor: DateTime<Utc>,
    schedule: &Schedule,
) -> Result<usize> {
    let placements = placements(anchor, schedule);
    store.apply_schedule(&placements).await?;
    Ok(placements.len())
}

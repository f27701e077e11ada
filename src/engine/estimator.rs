//! Sequential estimation for newly inserted tasks.
//!
//! A new task is appended after the latest end on its machine, ignoring
//! precedences and capacity. The placement is provisional: the next
//! optimization run replaces it.

use chrono::{DateTime, Utc};

use super::materializer::truncate_to_minute;
use crate::models::hours_to_duration;

/// Provisional `(start, end)` for a task of `duration_hours`.
///
/// Starts at the latest end on the machine, or `now` when the machine has no
/// timed work, rounded down to the minute. The end is exact to the second.
pub fn estimate_placement(
    latest_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    duration_hours: f64,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = truncate_to_minute(latest_end.unwrap_or(now));
    (start, start + hours_to_duration(duration_hours))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, h, m, s).unwrap()
    }

    #[test]
    fn test_appends_after_latest_end() {
        let (start, end) = estimate_placement(Some(t(14, 0, 0)), t(9, 0, 0), 2.0);
        assert_eq!(start, t(14, 0, 0));
        assert_eq!(end, t(16, 0, 0));
    }

    #[test]
    fn test_empty_machine_starts_now() {
        let (start, end) = estimate_placement(None, t(9, 17, 42), 0.5);
        assert_eq!(start, t(9, 17, 0));
        assert_eq!(end, t(9, 47, 0));
    }

    #[test]
    fn test_end_keeps_second_precision() {
        // 0.01 h = 36 s
        let (start, end) = estimate_placement(Some(t(10, 0, 30)), t(9, 0, 0), 0.01);
        assert_eq!(start, t(10, 0, 0));
        assert_eq!(end - start, Duration::seconds(36));
    }
}

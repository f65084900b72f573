//! Time utility functions
//!
//! Parsing of user-supplied due dates for the CLI.

use crate::error::{Result, TaskError};
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Parse an offset string (e.g. "3d", "12h", "30m", "2w") into a Duration
///
/// Supported units: `w` weeks, `d` days, `h` hours, `m` minutes, `s` seconds.
/// Negative offsets are accepted so overdue tasks can be recorded.
pub fn parse_offset(offset: &str) -> Result<Duration> {
    let offset = offset.trim();

    let format_err = || {
        TaskError::InvalidInput(
            "Offset must be in format like '3d', '12h', '30m', '2w', or '10s'".to_string(),
        )
    };

    // Split on a char boundary; the unit may be any user-supplied character.
    let (unit_start, _) = offset.char_indices().last().ok_or_else(format_err)?;
    if unit_start == 0 {
        return Err(format_err());
    }
    let (num_str, unit) = offset.split_at(unit_start);
    let num: i64 = num_str.parse().map_err(|_| {
        TaskError::InvalidInput(format!("Invalid number in offset: '{}'", num_str))
    })?;

    let duration = match unit {
        "w" => Duration::try_weeks(num),
        "d" => Duration::try_days(num),
        "h" => Duration::try_hours(num),
        "m" => Duration::try_minutes(num),
        "s" => Duration::try_seconds(num),
        _ => {
            return Err(TaskError::InvalidInput(format!(
                "Invalid offset unit '{}'. Use 'w' (weeks), 'd' (days), 'h' (hours), 'm' (minutes) or 's' (seconds)",
                unit
            )))
        },
    };

    duration.ok_or_else(|| TaskError::InvalidInput(format!("Offset '{}' is out of range", offset)))
}

/// Resolve a due-date argument relative to `now`.
///
/// Accepts, in order: an offset (`3d`), a calendar date (`2025-01-31`, taken
/// as the last second of that day in UTC) or an RFC 3339 timestamp.
pub fn parse_due_date(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date
            .and_hms_opt(23, 59, 59)
            .map(|naive| naive.and_utc())
            .ok_or_else(|| TaskError::InvalidInput(format!("Invalid date '{}'", input)));
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }

    let offset = parse_offset(input).map_err(|_| {
        TaskError::InvalidInput(format!(
            "Invalid due date '{}'. Use an offset like '3d', a date like '2025-01-31' or an RFC 3339 timestamp",
            input
        ))
    })?;

    now.checked_add_signed(offset)
        .ok_or_else(|| TaskError::InvalidInput(format!("Due date '{}' is out of range", input)))
}

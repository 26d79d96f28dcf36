//! Human-readable labels for timestamps and dates.

use chrono::{DateTime, NaiveDate, Utc};

const UNITS: [(i64, &str); 5] = [
    (31_536_000, "years"),
    (2_592_000, "months"),
    (86_400, "days"),
    (3_600, "hours"),
    (60, "minutes"),
];

const JUST_NOW_SECONDS: i64 = 10;

/// Coarse "N units ago" label for a past timestamp.
///
/// The first unit whose quotient is strictly greater than one wins, floored.
/// Anything below a minute is "just now" under ten seconds and "N seconds ago"
/// otherwise. Timestamps in the future also read as "just now".
#[must_use]
pub fn format_time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(then).num_seconds();

    for (unit_seconds, label) in UNITS {
        // quotient > 1 <=> seconds > unit_seconds
        if seconds > unit_seconds {
            return format!("{} {label} ago", seconds / unit_seconds);
        }
    }

    if seconds < JUST_NOW_SECONDS {
        "just now".to_string()
    } else {
        format!("{seconds} seconds ago")
    }
}

/// Short due-date label such as "Mar 5", or "No due date".
#[must_use]
pub fn format_due_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(
        || "No due date".to_string(),
        |date| date.format("%b %-d").to_string(),
    )
}

/// Long date label such as "March 5, 2024", used by the timeline.
#[must_use]
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

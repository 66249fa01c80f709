//! Timestamp formatting.

use chrono::{DateTime, Local, Utc};

/// "just now", "N mins ago", "N hours ago", "N days ago", then the date.
///
/// Timestamps in the future fall through to the date.
pub fn relative(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(timestamp) = timestamp else {
        return "-".to_string();
    };
    let elapsed = now.signed_duration_since(timestamp);
    if elapsed.num_seconds() < 0 {
        return date(timestamp);
    }

    let mins = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();
    if mins < 1 {
        "just now".to_string()
    } else if mins < 60 {
        format!("{mins} {} ago", plural(mins, "min"))
    } else if hours < 24 {
        format!("{hours} {} ago", plural(hours, "hour"))
    } else if days < 7 {
        format!("{days} {} ago", plural(days, "day"))
    } else {
        date(timestamp)
    }
}

/// Local calendar date.
pub fn date(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

/// Local date and time, or `Unknown`.
pub fn full(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp.map_or_else(
        || "Unknown".to_string(),
        |ts| {
            ts.with_timezone(&Local)
                .format("%a, %d %b %Y %H:%M:%S")
                .to_string()
        },
    )
}

/// Compact local timestamp for table cells.
pub fn short(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp.map_or_else(
        || "-".to_string(),
        |ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        unit.to_string()
    } else {
        format!("{unit}s")
    }
}

//! Formatting helpers shared across front ends.

use chrono::{DateTime, Utc};

/// Format a timeline offset as an axis label: `"45m"` below an hour, then
/// hours to one decimal (`"1.5h"`, `"3h"`).
pub fn format_offset_label(minutes: f64) -> String {
    let minutes = minutes.max(0.0);
    if minutes.round() < 60.0 {
        return format!("{}m", minutes.round() as i64);
    }
    let tenths = (minutes / 6.0).round() as i64;
    if tenths % 10 == 0 {
        format!("{}h", tenths / 10)
    } else {
        format!("{}.{}h", tenths / 10, tenths % 10)
    }
}

/// Format a timestamp relative to `now` (e.g., "2m ago").
pub fn format_relative_time_from(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(ts);

    if duration.num_seconds() < 0 {
        "just now".to_string()
    } else if duration.num_seconds() < 60 {
        format!("{}s ago", duration.num_seconds())
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_days() < 7 {
        format!("{}d ago", duration.num_days())
    } else {
        ts.format("%b %d").to_string()
    }
}

/// Format a timestamp as relative time (e.g., "2m ago").
pub fn format_relative_time(ts: DateTime<Utc>) -> String {
    format_relative_time_from(ts, Utc::now())
}

/// "Last updated" text for a dataset; bundled data was never synced.
pub fn format_last_synced(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => format_relative_time(ts),
        None => "never".to_string(),
    }
}

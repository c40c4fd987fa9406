//! Relative-time labels for notification lists and toasts.

use chrono::{DateTime, Utc};

/// Render `created_at` relative to `now`: "just now", "5m ago", "3h ago",
/// "2d ago", or a calendar date after a week.
///
/// Timestamps in the future (clock skew between producer and viewer) are
/// shown as "just now".
pub fn relative_time(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created_at);
    let minutes = elapsed.num_minutes();

    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{}d ago", elapsed.num_days())
    } else {
        created_at.format("%Y-%m-%d").to_string()
    }
}

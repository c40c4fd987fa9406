//! Notification sync configuration.

use serde::{Deserialize, Serialize};

/// Hard upper bound on the number of records a single pull may request.
pub const MAX_PULL_LIMIT: usize = 50;

/// Settings for the notification store, sync engine, and live feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Remote table holding notification rows.
    #[serde(default = "default_table")]
    pub table: String,
    /// Number of most-recent records fetched per pull (at most 50).
    #[serde(default = "default_pull_limit")]
    pub pull_limit: usize,
    /// Channel on which the database announces inserted rows.
    #[serde(default = "default_feed_channel")]
    pub feed_channel: String,
    /// Buffer size of the in-process event fan-out.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Raise a generic alert when feed events were dropped due to lag.
    #[serde(default)]
    pub alert_on_lagged: bool,
}

impl SyncConfig {
    /// The pull limit clamped to `1..=MAX_PULL_LIMIT`.
    pub fn effective_pull_limit(&self) -> usize {
        self.pull_limit.clamp(1, MAX_PULL_LIMIT)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            pull_limit: default_pull_limit(),
            feed_channel: default_feed_channel(),
            event_buffer: default_event_buffer(),
            alert_on_lagged: false,
        }
    }
}

fn default_table() -> String {
    "notifications".to_string()
}

fn default_pull_limit() -> usize {
    MAX_PULL_LIMIT
}

fn default_feed_channel() -> String {
    "notifications_insert".to_string()
}

fn default_event_buffer() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_limit_is_clamped() {
        let mut config = SyncConfig::default();
        assert_eq!(config.effective_pull_limit(), 50);
        config.pull_limit = 500;
        assert_eq!(config.effective_pull_limit(), 50);
        config.pull_limit = 0;
        assert_eq!(config.effective_pull_limit(), 1);
        config.pull_limit = 20;
        assert_eq!(config.effective_pull_limit(), 20);
    }
}

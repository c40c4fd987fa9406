//! Sync engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters describing pull and live-feed activity.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    /// Pull rounds that reached the remote table
    pub pulls_started: AtomicU64,
    /// Pull rounds whose result replaced the store
    pub pulls_applied: AtomicU64,
    /// Pull requests folded into an in-flight pull
    pub pulls_coalesced: AtomicU64,
    /// Pull rounds that failed
    pub pulls_failed: AtomicU64,
    /// Insert events received from the live feed
    pub events_received: AtomicU64,
    /// Insert events lost because the receiver lagged
    pub events_lagged: AtomicU64,
    /// Alerts handed to the alert sink
    pub alerts_raised: AtomicU64,
    /// Remote read-state updates confirmed
    pub reads_confirmed: AtomicU64,
}

impl SyncMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a counter by one
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        SyncMetricsSnapshot {
            pulls_started: self.pulls_started.load(Ordering::Relaxed),
            pulls_applied: self.pulls_applied.load(Ordering::Relaxed),
            pulls_coalesced: self.pulls_coalesced.load(Ordering::Relaxed),
            pulls_failed: self.pulls_failed.load(Ordering::Relaxed),
            events_received: self.events_received.load(Ordering::Relaxed),
            events_lagged: self.events_lagged.load(Ordering::Relaxed),
            alerts_raised: self.alerts_raised.load(Ordering::Relaxed),
            reads_confirmed: self.reads_confirmed.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncMetricsSnapshot {
    /// Pull rounds that reached the remote table
    pub pulls_started: u64,
    /// Pull rounds whose result replaced the store
    pub pulls_applied: u64,
    /// Pull requests folded into an in-flight pull
    pub pulls_coalesced: u64,
    /// Pull rounds that failed
    pub pulls_failed: u64,
    /// Insert events received from the live feed
    pub events_received: u64,
    /// Insert events lost because the receiver lagged
    pub events_lagged: u64,
    /// Alerts handed to the alert sink
    pub alerts_raised: u64,
    /// Remote read-state updates confirmed
    pub reads_confirmed: u64,
}

//! Coalescing pull driver and live feed wiring.

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use carehub_core::config::SyncConfig;
use carehub_core::error::AppError;
use carehub_core::result::AppResult;

use crate::alert::AlertSink;
use crate::feed::{FeedSubscription, LiveFeed, SubscriptionOptions};
use crate::metrics::SyncMetrics;
use crate::store::NotificationStore;
use crate::table::NotificationTable;

/// Result of a pull as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullOutcome {
    /// Records now held by the store.
    pub records: usize,
    /// Unread records now held by the store.
    pub unread: usize,
    /// Store version written by the last round.
    pub version: u64,
    /// The request joined a pull that was already in flight.
    pub coalesced: bool,
}

/// Health of the engine as of the last completed pull round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// When a pull last replaced the store.
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Error of the last round, cleared by the next successful one.
    pub last_error: Option<String>,
    /// Rounds whose result replaced the store.
    pub pulls_applied: u64,
}

/// Pull coordinator state. Never held across an await.
#[derive(Debug, Default)]
struct PullState {
    in_flight: bool,
    dirty: bool,
    /// Number of the most recently started round.
    round: u64,
}

type RoundResult = AppResult<PullOutcome>;

/// Result of one finished round, published to waiting callers.
#[derive(Debug, Clone)]
struct RoundReport {
    round: u64,
    result: RoundResult,
}

/// Keeps a [`NotificationStore`] in step with the remote table.
///
/// At most one pull is in flight at a time. Requests arriving meanwhile set
/// a dirty flag, and exactly one more round runs after the current one.
/// Rounds run back to back, so the last completed round is what the store
/// holds.
#[derive(Debug)]
pub struct SyncEngine {
    table: Arc<dyn NotificationTable>,
    store: Arc<NotificationStore>,
    /// Remote table name, used for feed subscriptions.
    table_name: String,
    pull_limit: usize,
    state: Mutex<PullState>,
    /// Result of the most recently finished round.
    finished: watch::Sender<Option<RoundReport>>,
    status: RwLock<SyncStatus>,
    metrics: Arc<SyncMetrics>,
}

impl SyncEngine {
    /// Create an engine pulling from `table` into `store`.
    pub fn new(
        table: Arc<dyn NotificationTable>,
        store: Arc<NotificationStore>,
        config: &SyncConfig,
    ) -> Self {
        let (finished, _) = watch::channel(None);
        Self {
            table,
            store,
            table_name: config.table.clone(),
            pull_limit: config.effective_pull_limit(),
            state: Mutex::new(PullState::default()),
            finished,
            status: RwLock::new(SyncStatus::default()),
            metrics: Arc::new(SyncMetrics::new()),
        }
    }

    /// Fetch the most recent records and replace the store with them.
    ///
    /// If a pull is already in flight the request is folded into it and
    /// this call waits for the one extra round it caused, not for any
    /// round requested after it. On failure the store keeps its last good
    /// snapshot and the error is returned.
    pub async fn pull(self: &Arc<Self>) -> AppResult<PullOutcome> {
        let (mut finished, started, target) = {
            let mut state = self.lock_state();
            let rx = self.finished.subscribe();
            let (started, target) = self.try_begin(&mut state);
            (rx, started, target)
        };
        if started {
            self.spawn_drain();
        }

        let report = finished
            .wait_for(|report| report.as_ref().is_some_and(|r| r.round >= target))
            .await
            .map_err(|_| AppError::service_unavailable("Sync engine stopped"))?
            .clone();

        match report {
            Some(report) => report.result.map(|outcome| PullOutcome {
                coalesced: !started,
                ..outcome
            }),
            None => Err(AppError::internal("Pull finished without a result")),
        }
    }

    /// Schedule a pull without waiting for it.
    pub fn request_pull(self: &Arc<Self>) {
        let (started, _) = {
            let mut state = self.lock_state();
            self.try_begin(&mut state)
        };
        if started {
            self.spawn_drain();
        }
    }

    /// Open the live feed for this engine's table.
    ///
    /// Every insert event raises an alert on `alerts` and schedules a pull.
    /// The returned handle owns the feed; dropping it releases it.
    pub async fn subscribe(
        self: &Arc<Self>,
        feed: &dyn LiveFeed,
        alerts: Arc<dyn AlertSink>,
    ) -> AppResult<FeedSubscription> {
        self.subscribe_with(feed, alerts, SubscriptionOptions::default())
            .await
    }

    /// [`subscribe`](Self::subscribe) with explicit options.
    pub async fn subscribe_with(
        self: &Arc<Self>,
        feed: &dyn LiveFeed,
        alerts: Arc<dyn AlertSink>,
        options: SubscriptionOptions,
    ) -> AppResult<FeedSubscription> {
        let stream = feed.subscribe(&self.table_name).await?;
        Ok(FeedSubscription::spawn(
            &self.table_name,
            stream,
            Arc::clone(self),
            alerts,
            options,
        ))
    }

    /// Whether a pull is currently in flight.
    pub fn is_pulling(&self) -> bool {
        self.lock_state().in_flight
    }

    /// Status as of the last completed round.
    pub fn status(&self) -> SyncStatus {
        self.status
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Shared activity counters.
    pub fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.metrics
    }

    /// The store this engine writes.
    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.store
    }

    /// The remote table this engine reads.
    pub fn table(&self) -> &Arc<dyn NotificationTable> {
        &self.table
    }

    /// Remote table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Claim the in-flight slot, or mark the running pull dirty.
    ///
    /// Returns whether a drain must be started and the round whose result
    /// answers this request.
    fn try_begin(&self, state: &mut PullState) -> (bool, u64) {
        if state.in_flight {
            state.dirty = true;
            SyncMetrics::inc(&self.metrics.pulls_coalesced);
            debug!(round = state.round + 1, "Pull already in flight; coalescing");
            (false, state.round + 1)
        } else {
            state.in_flight = true;
            state.dirty = false;
            state.round += 1;
            (true, state.round)
        }
    }

    fn spawn_drain(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.drain().await });
    }

    /// Run rounds until no request arrived during the last one.
    async fn drain(&self) {
        loop {
            let result = self.pull_once().await;
            if self.finish_round(result) {
                return;
            }
        }
    }

    /// Publish the round's result, then release the slot unless the round
    /// was made dirty. Returns `true` when the drain is over.
    fn finish_round(&self, result: RoundResult) -> bool {
        let mut state = self.lock_state();
        self.finished.send_replace(Some(RoundReport {
            round: state.round,
            result,
        }));

        if state.dirty {
            state.dirty = false;
            state.round += 1;
            return false;
        }
        state.in_flight = false;
        true
    }

    async fn pull_once(&self) -> RoundResult {
        SyncMetrics::inc(&self.metrics.pulls_started);

        match self.table.select_recent(self.pull_limit).await {
            Ok(records) => {
                let version = self.store.replace_all(records);
                let outcome = PullOutcome {
                    records: self.store.len(),
                    unread: self.store.unread_count(),
                    version,
                    coalesced: false,
                };

                SyncMetrics::inc(&self.metrics.pulls_applied);
                {
                    let mut status = self.status.write().unwrap_or_else(|e| e.into_inner());
                    status.last_synced_at = Some(Utc::now());
                    status.last_error = None;
                    status.pulls_applied += 1;
                }

                info!(
                    records = outcome.records,
                    unread = outcome.unread,
                    version,
                    "Notifications pulled"
                );
                Ok(outcome)
            }
            Err(e) => {
                SyncMetrics::inc(&self.metrics.pulls_failed);
                self.status
                    .write()
                    .unwrap_or_else(|e| e.into_inner())
                    .last_error = Some(e.to_string());

                warn!(
                    error = %e,
                    transient = e.kind.is_transient(),
                    "Pull failed; keeping last snapshot"
                );
                Err(e)
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, PullState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::MemoryTable;
    use carehub_core::types::id::NotificationId;
    use carehub_entity::notification::{NewNotification, NotificationType};
    use chrono::Duration;

    fn engine_over(table: Arc<MemoryTable>) -> Arc<SyncEngine> {
        Arc::new(SyncEngine::new(
            table,
            Arc::new(NotificationStore::default()),
            &SyncConfig::default(),
        ))
    }

    fn seeded(n: i64) -> Arc<MemoryTable> {
        let table = MemoryTable::new();
        let now = Utc::now();
        table.seed((0..n).map(|i| {
            NewNotification::new(NotificationType::Appointment, format!("Visit {i}"), "Room 2")
                .into_notification(NotificationId::new(), now - Duration::minutes(i))
        }));
        Arc::new(table)
    }

    #[tokio::test]
    async fn test_pull_replaces_store() {
        let engine = engine_over(seeded(3));

        let outcome = engine.pull().await.unwrap();

        assert_eq!(outcome.records, 3);
        assert_eq!(outcome.unread, 3);
        assert!(!outcome.coalesced);
        assert_eq!(engine.store().len(), 3);
        assert!(!engine.is_pulling());

        let status = engine.status();
        assert!(status.last_synced_at.is_some());
        assert_eq!(status.pulls_applied, 1);
    }

    #[tokio::test]
    async fn test_pull_is_capped_at_fifty() {
        let engine = engine_over(seeded(80));

        engine.pull().await.unwrap();

        assert_eq!(engine.store().len(), 50);
    }

    #[tokio::test]
    async fn test_failed_pull_keeps_snapshot() {
        let table = seeded(2);
        let engine = engine_over(Arc::clone(&table));
        engine.pull().await.unwrap();
        let before = engine.store().snapshot();

        table.fail_next_select(AppError::database("connection reset"));
        let err = engine.pull().await.unwrap_err();

        assert_eq!(err.kind, carehub_core::error::ErrorKind::Database);
        assert_eq!(engine.store().snapshot(), before);
        assert!(engine.status().last_error.is_some());
        assert_eq!(engine.metrics().snapshot().pulls_failed, 1);
        assert!(!engine.is_pulling());
    }

    #[tokio::test]
    async fn test_success_clears_last_error() {
        let table = seeded(1);
        let engine = engine_over(Arc::clone(&table));

        table.fail_next_select(AppError::database("timeout"));
        assert!(engine.pull().await.is_err());
        engine.pull().await.unwrap();

        assert!(engine.status().last_error.is_none());
    }
}

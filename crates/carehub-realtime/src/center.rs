//! Top-level notification center tying the store, engine and mutator together.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use carehub_core::config::SyncConfig;
use carehub_core::result::AppResult;
use carehub_core::types::id::{NotificationId, UserId};
use carehub_entity::notification::Notification;

use crate::alert::AlertSink;
use crate::feed::{FeedSubscription, LiveFeed, SubscriptionOptions};
use crate::metrics::SyncMetricsSnapshot;
use crate::store::NotificationStore;
use crate::sync::{PullOutcome, ReadConfirmation, ReadStateMutator, SyncEngine, SyncStatus};
use crate::table::{NotificationTable, UpdateOutcome};

/// What a dashboard holds: one store, the engine feeding it and the
/// mutator writing read state.
#[derive(Clone)]
pub struct NotificationCenter {
    /// Snapshot rendered by the UI.
    pub store: Arc<NotificationStore>,
    /// Pull driver.
    pub engine: Arc<SyncEngine>,
    /// Read-state writer.
    pub mutator: ReadStateMutator,
    alert_on_lagged: bool,
}

impl std::fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("table", &self.engine.table_name())
            .field("records", &self.store.len())
            .finish()
    }
}

impl NotificationCenter {
    /// Build a center over `table`.
    pub fn new(table: Arc<dyn NotificationTable>, config: &SyncConfig) -> Self {
        let store = Arc::new(NotificationStore::new(config.effective_pull_limit()));
        let engine = Arc::new(SyncEngine::new(table, Arc::clone(&store), config));
        let mutator = ReadStateMutator::new(Arc::clone(&engine));

        info!(table = %config.table, limit = store.capacity(), "Notification center initialized");

        Self {
            store,
            engine,
            mutator,
            alert_on_lagged: config.alert_on_lagged,
        }
    }

    /// Current snapshot, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.store.snapshot()
    }

    /// Unread records in the current snapshot.
    pub fn unread_count(&self) -> usize {
        self.store.unread_count()
    }

    /// Pull now.
    pub async fn refresh(&self) -> AppResult<PullOutcome> {
        self.engine.pull().await
    }

    pub async fn mark_as_read(
        &self,
        id: NotificationId,
    ) -> AppResult<ReadConfirmation<UpdateOutcome>> {
        self.mutator.mark_as_read(id).await
    }

    pub async fn mark_all_as_read(
        &self,
        user: Option<UserId>,
    ) -> AppResult<ReadConfirmation<u64>> {
        self.mutator.mark_all_as_read(user).await
    }

    /// Open the live feed; see [`SyncEngine::subscribe`].
    pub async fn subscribe(
        &self,
        feed: &dyn LiveFeed,
        alerts: Arc<dyn AlertSink>,
    ) -> AppResult<FeedSubscription> {
        let options = SubscriptionOptions {
            alert_on_lagged: self.alert_on_lagged,
        };
        self.engine.subscribe_with(feed, alerts, options).await
    }

    /// Store version changes.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.store.watch()
    }

    pub fn status(&self) -> SyncStatus {
        self.engine.status()
    }

    pub fn metrics(&self) -> SyncMetricsSnapshot {
        self.engine.metrics().snapshot()
    }
}

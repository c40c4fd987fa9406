//! Confirm-then-refetch read-state changes.

use std::sync::Arc;

use tracing::{info, warn};

use carehub_core::result::AppResult;
use carehub_core::types::id::{NotificationId, UserId};

use crate::metrics::SyncMetrics;
use crate::table::{NotificationTable, UpdateOutcome};

use super::engine::{PullOutcome, SyncEngine};

/// A remote change the table confirmed, plus the refetch that followed it.
#[derive(Debug, Clone)]
pub struct ReadConfirmation<T> {
    /// What the remote table reported.
    pub confirmed: T,
    /// The refetch after the change. On error the store still shows the
    /// state from before the change.
    pub refetch: AppResult<PullOutcome>,
}

impl<T> ReadConfirmation<T> {
    /// Whether the store has not caught up with the confirmed change.
    pub fn is_stale(&self) -> bool {
        self.refetch.is_err()
    }

    /// Whether calling [`SyncEngine::pull`] again is likely to help.
    pub fn should_retry(&self) -> bool {
        matches!(&self.refetch, Err(e) if e.kind.is_transient())
    }
}

/// Flips read state on the remote table, then refetches.
///
/// The store is never patched locally: a record shows as read only once a
/// pull has returned it that way. Calls for different ids run
/// independently; their refetches coalesce in the engine.
#[derive(Debug, Clone)]
pub struct ReadStateMutator {
    table: Arc<dyn NotificationTable>,
    engine: Arc<SyncEngine>,
}

impl ReadStateMutator {
    /// Create a mutator writing to `engine`'s table.
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self {
            table: Arc::clone(engine.table()),
            engine,
        }
    }

    /// Mark one notification as read.
    ///
    /// A missing row is not an error. If the remote update fails the error
    /// is returned and nothing is refetched. A failed refetch after a
    /// confirmed update is reported in [`ReadConfirmation::refetch`].
    pub async fn mark_as_read(
        &self,
        id: NotificationId,
    ) -> AppResult<ReadConfirmation<UpdateOutcome>> {
        let outcome = self.table.mark_read(id).await?;

        match outcome {
            UpdateOutcome::Updated => {
                SyncMetrics::inc(&self.engine.metrics().reads_confirmed);
                info!(notification_id = %id, "Notification marked as read");
            }
            UpdateOutcome::NotFound => {
                info!(notification_id = %id, "Notification to mark as read not found");
            }
        }

        Ok(ReadConfirmation {
            confirmed: outcome,
            refetch: self.refetch().await,
        })
    }

    /// Mark every unread notification visible to `user` as read.
    ///
    /// `None` covers every row. [`ReadConfirmation::confirmed`] holds the
    /// number of rows changed.
    pub async fn mark_all_as_read(&self, user: Option<UserId>) -> AppResult<ReadConfirmation<u64>> {
        let changed = self.table.mark_all_read(user).await?;
        info!(changed, user_id = ?user, "Notifications marked as read");

        Ok(ReadConfirmation {
            confirmed: changed,
            refetch: self.refetch().await,
        })
    }

    async fn refetch(&self) -> AppResult<PullOutcome> {
        let refetch = self.engine.pull().await;
        if let Err(e) = &refetch {
            warn!(error = %e, "Refetch after read-state change failed");
        }
        refetch
    }
}

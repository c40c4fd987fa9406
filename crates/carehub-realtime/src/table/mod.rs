//! Remote notification table access.
//!
//! The sync core only needs three operations from the remote store: a
//! bounded newest-first select, a keyed read-flag update, and (for
//! producers and tests) an insert.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use carehub_core::result::AppResult;
use carehub_core::types::id::{NotificationId, UserId};
use carehub_entity::notification::{NewNotification, Notification};

pub use memory::MemoryTable;

/// Result of a keyed update against the remote table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The row existed and was updated (or already had the value).
    Updated,
    /// No row matched the id.
    NotFound,
}

/// Access to the remote `notifications` table.
#[async_trait]
pub trait NotificationTable: Send + Sync + std::fmt::Debug + 'static {
    /// Up to `limit` most recent records, ordered by `created_at` descending.
    async fn select_recent(&self, limit: usize) -> AppResult<Vec<Notification>>;

    /// Set `is_read = true` on the row with the given id.
    async fn mark_read(&self, id: NotificationId) -> AppResult<UpdateOutcome>;

    /// Set `is_read = true` on every unread row visible to `user`.
    /// Returns the number of rows changed.
    async fn mark_all_read(&self, user: Option<UserId>) -> AppResult<u64>;

    /// Insert a new record and return it as stored.
    async fn insert(&self, new: NewNotification) -> AppResult<Notification>;

    /// The user this table is scoped to. `None` means every row is pulled.
    fn recipient(&self) -> Option<UserId> {
        None
    }
}

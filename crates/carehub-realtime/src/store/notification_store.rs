//! The notification store: the single snapshot the UI renders from.
//!
//! Writes are always full replacements. No delta is ever merged into the
//! snapshot, so ordering and merge conflicts cannot arise inside the store;
//! the cost is that every change is a refetch.

use std::sync::{RwLock, RwLockReadGuard};

use tokio::sync::watch;

use carehub_core::config::sync::MAX_PULL_LIMIT;
use carehub_core::types::id::NotificationId;
use carehub_entity::notification::Notification;

/// Bounded, ordered collection of notification records.
///
/// The collection is kept in the order the writer supplied (newest first
/// for pulls) and never grows past its capacity. Every replacement bumps a
/// version number published on a `watch` channel.
#[derive(Debug)]
pub struct NotificationStore {
    /// Maximum number of records retained.
    capacity: usize,
    /// Current snapshot.
    records: RwLock<Vec<Notification>>,
    /// Snapshot version, bumped on every replacement.
    version: watch::Sender<u64>,
}

impl NotificationStore {
    /// Create an empty store holding at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            capacity: capacity.max(1),
            records: RwLock::new(Vec::new()),
            version,
        }
    }

    /// Atomically replace the whole collection.
    ///
    /// The caller's order is preserved; records past the capacity are
    /// dropped from the tail. Returns the new snapshot version.
    pub fn replace_all(&self, mut records: Vec<Notification>) -> u64 {
        if records.len() > self.capacity {
            tracing::debug!(
                received = records.len(),
                capacity = self.capacity,
                "Truncating notification snapshot"
            );
            records.truncate(self.capacity);
        }

        let mut current = self.records.write().unwrap_or_else(|e| e.into_inner());
        *current = records;

        let mut next = 0;
        self.version.send_modify(|v| {
            *v += 1;
            next = *v;
        });
        next
    }

    /// Number of unread records in the current snapshot.
    pub fn unread_count(&self) -> usize {
        self.read().iter().filter(|n| n.is_unread()).count()
    }

    /// A copy of the current snapshot.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.read().clone()
    }

    /// Look up a record in the current snapshot.
    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.read().iter().find(|n| n.id == id).cloned()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Maximum number of records retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current snapshot version (0 before the first replacement).
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Receive snapshot versions as they change.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Notification>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new(MAX_PULL_LIMIT)
    }
}

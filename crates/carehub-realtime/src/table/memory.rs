//! In-memory [`NotificationTable`] for single-process deployments and tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use carehub_core::error::AppError;
use carehub_core::result::AppResult;
use carehub_core::types::id::{NotificationId, UserId};
use carehub_entity::notification::{NewNotification, Notification};

use crate::feed::memory::MemoryFeed;

use super::{NotificationTable, UpdateOutcome};

/// In-memory notification table.
///
/// Inserts are announced on the attached [`MemoryFeed`], mirroring the
/// database insert trigger. Failures can be injected to exercise the
/// stale-but-available error paths.
#[derive(Debug, Default)]
pub struct MemoryTable {
    /// All rows, in insertion order.
    rows: Mutex<Vec<Notification>>,
    /// Feed receiving insert events.
    feed: Option<Arc<MemoryFeed>>,
    /// Table name used when publishing on the feed.
    name: String,
    /// Recipient the table is scoped to.
    user: Option<UserId>,
    /// Error returned by the next select, if armed.
    fail_next_select: Mutex<Option<AppError>>,
    /// Error returned by the next update, if armed.
    fail_next_update: Mutex<Option<AppError>>,
    /// Number of selects served.
    select_calls: AtomicU64,
    /// Number of single-row updates served.
    update_calls: AtomicU64,
}

impl MemoryTable {
    /// Create an empty table that announces nothing.
    pub fn new() -> Self {
        Self {
            name: "notifications".to_string(),
            ..Self::default()
        }
    }

    /// Create an empty table that announces inserts on `feed` under `name`.
    pub fn with_feed(name: impl Into<String>, feed: Arc<MemoryFeed>) -> Self {
        Self {
            name: name.into(),
            feed: Some(feed),
            ..Self::default()
        }
    }

    /// Scope selects and bulk updates to `user` plus broadcasts.
    pub fn scoped_to(mut self, user: UserId) -> Self {
        self.user = Some(user);
        self
    }

    /// Load pre-built rows without announcing them.
    pub fn seed(&self, records: impl IntoIterator<Item = Notification>) {
        self.lock_rows().extend(records);
    }

    /// Make the next select fail with `err`.
    pub fn fail_next_select(&self, err: AppError) {
        *self
            .fail_next_select
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(err);
    }

    /// Make the next single-row update fail with `err`.
    pub fn fail_next_update(&self, err: AppError) {
        *self
            .fail_next_update
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(err);
    }

    /// Number of selects served so far.
    pub fn select_calls(&self) -> u64 {
        self.select_calls.load(Ordering::SeqCst)
    }

    /// Number of single-row updates served so far.
    pub fn update_calls(&self) -> u64 {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Current stored copy of a row.
    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.lock_rows().iter().find(|n| n.id == id).cloned()
    }

    /// Total number of stored rows.
    pub fn len(&self) -> usize {
        self.lock_rows().len()
    }

    /// Whether the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.lock_rows().is_empty()
    }

    fn lock_rows(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl NotificationTable for MemoryTable {
    async fn select_recent(&self, limit: usize) -> AppResult<Vec<Notification>> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self
            .fail_next_select
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            return Err(err);
        }

        let mut rows: Vec<_> = self
            .lock_rows()
            .iter()
            .filter(|n| n.is_visible_to(self.user))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    async fn mark_read(&self, id: NotificationId) -> AppResult<UpdateOutcome> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self
            .fail_next_update
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            return Err(err);
        }

        let mut rows = self.lock_rows();
        match rows.iter_mut().find(|n| n.id == id) {
            Some(row) => {
                row.is_read = true;
                Ok(UpdateOutcome::Updated)
            }
            None => Ok(UpdateOutcome::NotFound),
        }
    }

    async fn mark_all_read(&self, user: Option<UserId>) -> AppResult<u64> {
        let user = user.or(self.user);
        let mut changed = 0;
        for row in self.lock_rows().iter_mut() {
            if row.is_unread() && row.is_visible_to(user) {
                row.is_read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn insert(&self, new: NewNotification) -> AppResult<Notification> {
        new.validate()?;

        let record = new.into_notification(NotificationId::new(), Utc::now());
        self.lock_rows().push(record.clone());

        if let Some(feed) = &self.feed {
            feed.publish(&self.name, record.clone()).await;
        }
        Ok(record)
    }

    fn recipient(&self) -> Option<UserId> {
        self.user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carehub_entity::notification::NotificationType;
    use chrono::Duration;

    fn record(minutes_ago: i64) -> Notification {
        NewNotification::new(NotificationType::Alert, "Bed capacity", "Ward 4 full")
            .into_notification(NotificationId::new(), Utc::now() - Duration::minutes(minutes_ago))
    }

    #[tokio::test]
    async fn test_select_is_newest_first_and_bounded() {
        let table = MemoryTable::new();
        table.seed((0..10).map(record));

        let rows = table.select_recent(3).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].created_at > rows[1].created_at);
        assert!(rows[1].created_at > rows[2].created_at);
        assert_eq!(table.select_calls(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_reports_missing_rows() {
        let table = MemoryTable::new();
        let row = record(1);
        let id = row.id;
        table.seed([row]);

        assert_eq!(table.mark_read(id).await.unwrap(), UpdateOutcome::Updated);
        assert!(table.get(id).unwrap().is_read);
        assert_eq!(
            table.mark_read(NotificationId::new()).await.unwrap(),
            UpdateOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let table = MemoryTable::new();
        table.fail_next_select(AppError::database("connection reset"));

        assert!(table.select_recent(50).await.is_err());
        assert!(table.select_recent(50).await.is_ok());
    }

    #[tokio::test]
    async fn test_insert_rejects_blank_title() {
        let table = MemoryTable::new();
        let err = table
            .insert(NewNotification::new(NotificationType::System, "", "body"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, carehub_core::error::ErrorKind::Validation);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_mark_all_read_respects_recipient() {
        let alice = UserId::new();
        let bob = UserId::new();
        let table = MemoryTable::new();
        table.seed([
            NewNotification::new(NotificationType::Appointment, "Consult", "10:00")
                .for_user(alice)
                .into_notification(NotificationId::new(), Utc::now()),
            NewNotification::new(NotificationType::Appointment, "Consult", "11:00")
                .for_user(bob)
                .into_notification(NotificationId::new(), Utc::now()),
            record(5),
        ]);

        assert_eq!(table.mark_all_read(Some(alice)).await.unwrap(), 2);
        assert_eq!(table.mark_all_read(Some(bob)).await.unwrap(), 1);
        assert_eq!(table.mark_all_read(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_scoped_table_hides_other_recipients() {
        let nurse = UserId::new();
        let table = MemoryTable::new().scoped_to(nurse);
        let mine = NewNotification::new(NotificationType::Appointment, "Consult", "10:00")
            .for_user(nurse)
            .into_notification(NotificationId::new(), Utc::now());
        let other = NewNotification::new(NotificationType::Appointment, "Consult", "11:00")
            .for_user(UserId::new())
            .into_notification(NotificationId::new(), Utc::now());
        table.seed([mine.clone(), other, record(2)]);

        let rows = table.select_recent(50).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|n| n.is_visible_to(Some(nurse))));
        assert_eq!(table.recipient(), Some(nurse));
        assert_eq!(table.mark_all_read(None).await.unwrap(), 2);
    }
}

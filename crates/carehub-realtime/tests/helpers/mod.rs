//! Shared test helpers for carehub-realtime integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Semaphore, broadcast};
use tokio_util::sync::CancellationToken;

use carehub_core::config::SyncConfig;
use carehub_core::result::AppResult;
use carehub_core::types::id::{NotificationId, UserId};
use carehub_entity::notification::{NewNotification, Notification, NotificationType};
use carehub_realtime::alert::{Alert, AlertSink};
use carehub_realtime::feed::{FeedEvent, FeedStream, LiveFeed};
use carehub_realtime::table::{MemoryTable, NotificationTable, UpdateOutcome};

/// Build a stored record created `minutes_ago` minutes in the past.
pub fn notification(kind: NotificationType, title: &str, minutes_ago: i64) -> Notification {
    NewNotification::new(kind, title, format!("{title} details"))
        .into_notification(NotificationId::new(), Utc::now() - chrono::Duration::minutes(minutes_ago))
}

/// Build a stored record addressed to `user`.
pub fn notification_for(user: UserId, title: &str, minutes_ago: i64) -> Notification {
    let mut record = notification(NotificationType::Appointment, title, minutes_ago);
    record.user_id = Some(user);
    record
}

/// Default sync configuration.
pub fn sync_config() -> SyncConfig {
    SyncConfig::default()
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("Timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Let spawned tasks run for a moment.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

/// Table whose selects block until released, so pulls can be held in flight.
#[derive(Debug)]
pub struct GatedTable {
    /// Backing rows.
    pub inner: MemoryTable,
    gate: Semaphore,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl GatedTable {
    pub fn new(inner: MemoryTable) -> Self {
        Self {
            inner,
            gate: Semaphore::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// Let `n` more selects through.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Selects currently blocked or running.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent selects observed.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Selects that started.
    pub fn selects(&self) -> u64 {
        self.inner.select_calls()
    }
}

#[async_trait]
impl NotificationTable for GatedTable {
    async fn select_recent(&self, limit: usize) -> AppResult<Vec<Notification>> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        self.gate.acquire().await.expect("gate closed").forget();
        let rows = self.inner.select_recent(limit).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        rows
    }

    async fn mark_read(&self, id: NotificationId) -> AppResult<UpdateOutcome> {
        self.inner.mark_read(id).await
    }

    async fn mark_all_read(&self, user: Option<UserId>) -> AppResult<u64> {
        self.inner.mark_all_read(user).await
    }

    async fn insert(&self, new: NewNotification) -> AppResult<Notification> {
        self.inner.insert(new).await
    }

    fn recipient(&self) -> Option<UserId> {
        self.inner.recipient()
    }
}

/// Alert sink that keeps every alert.
#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlertSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

impl AlertSink for RecordingAlertSink {
    fn alert(&self, alert: Alert) {
        self.alerts.lock().unwrap().push(alert);
    }
}

/// Feed driven by hand: the test owns the sender and can close it.
#[derive(Debug)]
pub struct ManualFeed {
    sender: Mutex<Option<broadcast::Sender<FeedEvent>>>,
    release: CancellationToken,
}

impl ManualFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            sender: Mutex::new(Some(tx)),
            release: CancellationToken::new(),
        }
    }

    /// Emit an insert event. Returns the number of receivers reached.
    pub fn emit(&self, record: Notification) -> usize {
        self.sender
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|tx| {
                tx.send(FeedEvent::Inserted {
                    table: "notifications".to_string(),
                    record,
                })
                .ok()
            })
            .unwrap_or(0)
    }

    /// Drop the sender, ending the stream upstream.
    pub fn close(&self) {
        self.sender.lock().unwrap().take();
    }

    /// Whether the subscriber released the feed.
    pub fn released(&self) -> bool {
        self.release.is_cancelled()
    }
}

#[async_trait]
impl LiveFeed for ManualFeed {
    async fn subscribe(&self, _table: &str) -> AppResult<FeedStream> {
        let events = self
            .sender
            .lock()
            .unwrap()
            .as_ref()
            .map(|tx| tx.subscribe())
            .expect("feed already closed");
        Ok(FeedStream {
            events,
            release: self.release.clone(),
        })
    }
}

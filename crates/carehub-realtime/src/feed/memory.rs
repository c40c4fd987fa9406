//! In-memory feed for single-process deployments and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::sync::broadcast;

use carehub_core::result::AppResult;
use carehub_entity::notification::Notification;

use super::{FeedEvent, FeedStream, LiveFeed};

/// In-memory pub/sub keyed by table name.
#[derive(Debug)]
pub struct MemoryFeed {
    /// Table name → broadcast sender
    channels: RwLock<HashMap<String, broadcast::Sender<FeedEvent>>>,
    /// Buffer size for channels
    buffer_size: usize,
}

impl MemoryFeed {
    /// Create a new in-memory feed
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Announce an inserted record. Returns the number of subscribers reached.
    pub async fn publish(&self, table: &str, record: Notification) -> usize {
        let channels = self.channels.read().await;
        match channels.get(table) {
            Some(tx) => tx
                .send(FeedEvent::Inserted {
                    table: table.to_string(),
                    record,
                })
                .unwrap_or(0),
            None => 0,
        }
    }

    /// Number of live receivers on a table.
    pub async fn subscriber_count(&self, table: &str) -> usize {
        self.channels
            .read()
            .await
            .get(table)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl LiveFeed for MemoryFeed {
    async fn subscribe(&self, table: &str) -> AppResult<FeedStream> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(table.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer_size).0);
        Ok(FeedStream::new(tx.subscribe()))
    }
}

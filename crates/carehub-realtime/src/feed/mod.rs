//! Live feed of inserted notification records.
//!
//! A [`LiveFeed`] hands out a [`FeedStream`] per subscriber. The stream is
//! consumed by a [`FeedSubscription`], which owns it for the lifetime of one
//! UI context and releases it deterministically on teardown.

pub mod memory;
pub mod postgres;
pub mod subscription;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use carehub_core::result::AppResult;
use carehub_entity::notification::Notification;

pub use memory::MemoryFeed;
pub use postgres::PgNotificationFeed;
pub use subscription::{FeedSubscription, SubscriptionOptions};

/// An event delivered by the live feed.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A record was inserted into `table`.
    Inserted {
        /// Source table.
        table: String,
        /// The new record as published by the producer.
        record: Notification,
    },
}

/// One subscriber's view of the feed.
#[derive(Debug)]
pub struct FeedStream {
    /// Events for this subscriber.
    pub events: broadcast::Receiver<FeedEvent>,
    /// Cancelled when the subscriber goes away, releasing upstream resources.
    pub release: CancellationToken,
}

impl FeedStream {
    /// Wrap a receiver whose only upstream resource is itself.
    pub fn new(events: broadcast::Receiver<FeedEvent>) -> Self {
        Self {
            events,
            release: CancellationToken::new(),
        }
    }
}

/// Source of insert events for a table.
#[async_trait]
pub trait LiveFeed: Send + Sync + std::fmt::Debug + 'static {
    /// Subscribe to insert events on `table`.
    async fn subscribe(&self, table: &str) -> AppResult<FeedStream>;
}

//! [`LiveFeed`] backed by PostgreSQL `LISTEN/NOTIFY`.

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use carehub_core::config::SyncConfig;
use carehub_core::error::{AppError, ErrorKind};
use carehub_core::result::AppResult;
use carehub_database::listener::NotificationListener;
use carehub_entity::notification::Notification;

use super::{FeedEvent, FeedStream, LiveFeed};

/// Opens one listener connection per subscription and forwards decoded
/// insert events to the subscriber.
#[derive(Debug, Clone)]
pub struct PgNotificationFeed {
    pool: PgPool,
    table: String,
    channel: String,
    buffer_size: usize,
}

impl PgNotificationFeed {
    /// Create a feed for the table and NOTIFY channel named in `config`.
    pub fn new(pool: PgPool, config: &SyncConfig) -> Self {
        Self {
            pool,
            table: config.table.clone(),
            channel: config.feed_channel.clone(),
            buffer_size: config.event_buffer.max(1),
        }
    }
}

#[async_trait]
impl LiveFeed for PgNotificationFeed {
    async fn subscribe(&self, table: &str) -> AppResult<FeedStream> {
        if table != self.table {
            return Err(AppError::subscription(format!(
                "No insert channel configured for table '{table}'"
            )));
        }

        let mut listener = NotificationListener::connect(&self.pool).await?;
        listener.listen(&self.channel).await?;

        let (tx, rx) = broadcast::channel(self.buffer_size);
        let release = CancellationToken::new();

        tokio::spawn(forward(
            listener,
            tx,
            self.table.clone(),
            release.clone(),
        ));

        Ok(FeedStream {
            events: rx,
            release,
        })
    }
}

/// What the forwarding loop does with one listener result.
#[derive(Debug)]
enum Step {
    Forward(Notification),
    Skip(AppError),
    /// The connection is gone or unusable.
    Close(String),
}

fn classify(received: AppResult<Option<Notification>>) -> Step {
    match received {
        Ok(Some(record)) => Step::Forward(record),
        Ok(None) => Step::Close("connection lost".to_string()),
        Err(e) if e.kind == ErrorKind::Serialization => Step::Skip(e),
        Err(e) => Step::Close(e.to_string()),
    }
}

/// Pump NOTIFY payloads into the subscriber's channel until released.
///
/// Ending the task drops the sender, which the subscriber observes as a
/// closed feed. A lost connection ends the task too; no reconnection is
/// attempted.
async fn forward(
    mut listener: NotificationListener,
    tx: broadcast::Sender<FeedEvent>,
    table: String,
    release: CancellationToken,
) {
    let connected = loop {
        let received = tokio::select! {
            _ = release.cancelled() => break true,
            received = listener.try_recv() => received,
        };

        match classify(received) {
            Step::Forward(record) => {
                debug!(notification_id = %record.id, "Forwarding inserted notification");
                let event = FeedEvent::Inserted {
                    table: table.clone(),
                    record,
                };
                if tx.send(event).is_err() {
                    debug!("Feed subscriber gone; stopping listener");
                    break true;
                }
            }
            Step::Skip(e) => {
                warn!(error = %e, "Skipping undecodable notification payload");
            }
            Step::Close(reason) => {
                error!(table = %table, reason = %reason, "Notification listener closed");
                break false;
            }
        }
    };

    // UNLISTEN on a dead connection would reconnect first.
    if connected {
        if let Err(e) = listener.unlisten_all().await {
            debug!(error = %e, "UNLISTEN failed; connection will be closed anyway");
        }
    }
    info!(table = %table, "Notification listener released");
}

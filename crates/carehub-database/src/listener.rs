//! `LISTEN/NOTIFY` listener for inserted notification rows.
//!
//! The insert trigger installed by the migrations publishes each new row as
//! JSON on the `notifications_insert` channel. To stay under the 8000-byte
//! NOTIFY limit the payload leaves out `data` and cuts `title` and `message`
//! short, so a decoded record is only good enough for an alert.

use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tracing::{debug, info, warn};

use carehub_core::error::{AppError, ErrorKind};
use carehub_core::result::AppResult;
use carehub_entity::notification::Notification;

/// A dedicated PostgreSQL connection listening for inserted notifications.
///
/// Dropping the listener closes its connection, which releases every
/// `LISTEN` registration on the server.
#[derive(Debug)]
pub struct NotificationListener {
    inner: PgListener,
    channels: Vec<String>,
}

impl NotificationListener {
    /// Open a listener connection from an existing pool.
    pub async fn connect(pool: &PgPool) -> AppResult<Self> {
        let inner = PgListener::connect_with(pool).await.map_err(|e| {
            AppError::with_source(ErrorKind::Subscription, "Failed to open listener connection", e)
        })?;
        Ok(Self {
            inner,
            channels: Vec::new(),
        })
    }

    /// Start listening on a channel.
    pub async fn listen(&mut self, channel: &str) -> AppResult<()> {
        self.inner.listen(channel).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Subscription,
                format!("Failed to LISTEN on '{channel}'"),
                e,
            )
        })?;
        self.channels.push(channel.to_string());
        info!(channel, "Listening for inserted notifications");
        Ok(())
    }

    /// Stop listening on every channel.
    pub async fn unlisten_all(&mut self) -> AppResult<()> {
        self.inner.unlisten_all().await.map_err(|e| {
            AppError::with_source(ErrorKind::Subscription, "Failed to UNLISTEN", e)
        })?;
        self.channels.clear();
        Ok(())
    }

    /// Channels currently registered.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Wait for the next inserted notification.
    ///
    /// Returns `Ok(None)` when the connection was lost. Anything announced
    /// while it was down is gone, so callers should treat this as the end of
    /// the feed. Calling again would reconnect. A payload that cannot be
    /// decoded is reported as a serialization error and the listener stays
    /// usable afterwards.
    pub async fn try_recv(&mut self) -> AppResult<Option<Notification>> {
        let notification = self.inner.try_recv().await.map_err(|e| {
            AppError::with_source(ErrorKind::Subscription, "Listener connection failed", e)
        })?;

        let Some(notification) = notification else {
            warn!(channels = ?self.channels, "Listener connection lost");
            return Ok(None);
        };

        debug!(
            channel = notification.channel(),
            bytes = notification.payload().len(),
            "Received NOTIFY"
        );

        decode_payload(notification.payload()).map(Some)
    }
}

/// Decode a trigger payload into a notification.
pub fn decode_payload(payload: &str) -> AppResult<Notification> {
    serde_json::from_str(payload).map_err(|e| {
        AppError::with_source(
            ErrorKind::Serialization,
            format!("Malformed notification payload: {e}"),
            e,
        )
    })
}

//! Transient user-facing alerts (toasts) raised for live notifications.

pub mod formatter;
pub mod sinks;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use carehub_core::types::id::NotificationId;
use carehub_entity::notification::{Notification, NotificationType, Urgency};

pub use formatter::relative_time;
pub use sinks::{ChannelAlertSink, TracingAlertSink};

/// A toast to show the user. Fire-and-forget: nothing is acknowledged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// The notification that triggered the alert, if any.
    pub notification_id: Option<NotificationId>,
    /// Notification type, if the alert came from a record.
    pub kind: Option<NotificationType>,
    /// How prominently to show the toast.
    pub urgency: Urgency,
    /// Toast headline.
    pub title: String,
    /// Toast body.
    pub message: String,
    /// When the underlying event happened.
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Build the toast for a newly inserted notification.
    pub fn from_notification(notification: &Notification) -> Self {
        Self {
            notification_id: Some(notification.id),
            kind: Some(notification.kind),
            urgency: notification.kind.urgency(),
            title: notification.title.clone(),
            message: notification.message.clone(),
            timestamp: notification.created_at,
        }
    }

    /// Build the toast shown when live events were dropped.
    pub fn missed(count: u64) -> Self {
        Self {
            notification_id: None,
            kind: None,
            urgency: Urgency::Normal,
            title: "Missed updates".to_string(),
            message: format!("{count} notifications arrived while the live feed was behind"),
            timestamp: Utc::now(),
        }
    }
}

/// Receives toasts. Implementations must not block.
pub trait AlertSink: Send + Sync + std::fmt::Debug + 'static {
    /// Show an alert.
    fn alert(&self, alert: Alert);
}

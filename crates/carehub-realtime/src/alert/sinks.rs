//! Built-in alert sinks.

use tokio::sync::mpsc;

use super::{Alert, AlertSink};

/// Writes alerts to the log. Used by headless watchers.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn alert(&self, alert: Alert) {
        let id = alert.notification_id.map(|id| id.to_string());
        if alert.urgency.is_sticky() {
            tracing::warn!(
                notification_id = id.as_deref(),
                urgency = %alert.urgency,
                title = %alert.title,
                "{}",
                alert.message
            );
        } else {
            tracing::info!(
                notification_id = id.as_deref(),
                urgency = %alert.urgency,
                title = %alert.title,
                "{}",
                alert.message
            );
        }
    }
}

/// Forwards alerts to a UI task over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelAlertSink {
    sender: mpsc::UnboundedSender<Alert>,
}

impl ChannelAlertSink {
    /// Create a sink and the receiver the UI drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Alert>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl AlertSink for ChannelAlertSink {
    fn alert(&self, alert: Alert) {
        if self.sender.send(alert).is_err() {
            tracing::trace!("Alert receiver dropped; discarding toast");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carehub_core::types::id::NotificationId;
    use carehub_entity::notification::{NewNotification, NotificationType, Urgency};
    use chrono::Utc;

    #[test]
    fn test_channel_sink_forwards() {
        let (sink, mut rx) = ChannelAlertSink::new();
        let record = NewNotification::new(NotificationType::Emergency, "Stroke alert", "ETA 6 min")
            .into_notification(NotificationId::new(), Utc::now());

        sink.alert(Alert::from_notification(&record));

        let alert = rx.try_recv().expect("alert forwarded");
        assert_eq!(alert.title, "Stroke alert");
        assert_eq!(alert.message, "ETA 6 min");
        assert_eq!(alert.urgency, Urgency::Critical);
        assert_eq!(alert.notification_id, Some(record.id));
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (sink, rx) = ChannelAlertSink::new();
        drop(rx);
        sink.alert(Alert::missed(3));
    }
}

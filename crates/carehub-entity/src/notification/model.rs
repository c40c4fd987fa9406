//! Notification entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use carehub_core::AppError;
use carehub_core::types::id::{NotificationId, UserId};

use super::kind::NotificationType;

/// A notification row as stored in the remote `notifications` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// What the notification is about.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: NotificationType,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// The recipient; `None` means broadcast to every user.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Opaque structured context. Never interpreted by the sync core.
    #[serde(default)]
    pub data: serde_json::Value,
    /// Whether the notification has been read.
    #[serde(default)]
    pub is_read: bool,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Check if the notification is still unread.
    pub fn is_unread(&self) -> bool {
        !self.is_read
    }

    /// Whether the notification is addressed to `user` (directly or as a broadcast).
    pub fn is_visible_to(&self, user: Option<UserId>) -> bool {
        match (self.user_id, user) {
            (None, _) => true,
            (Some(recipient), Some(user)) => recipient == user,
            (Some(_), None) => true,
        }
    }
}

/// Longest accepted title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Longest accepted message body, in characters.
pub const MAX_MESSAGE_LEN: usize = 4000;

/// Fields supplied by a producer when inserting a notification.
///
/// The remote store assigns `id`, `is_read = false`, and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    /// What the notification is about.
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// The recipient; `None` means broadcast.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Opaque structured context.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl NewNotification {
    /// Create a broadcast notification with an empty payload.
    pub fn new(kind: NotificationType, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            user_id: None,
            data: serde_json::json!({}),
        }
    }

    /// Address the notification to a single user.
    pub fn for_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Attach an opaque payload.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Reject notifications with a blank or oversized title or message.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("Notification title must not be empty"));
        }
        if self.message.trim().is_empty() {
            return Err(AppError::validation("Notification message must not be empty"));
        }
        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::validation(format!(
                "Notification title must be at most {MAX_TITLE_LEN} characters"
            )));
        }
        if self.message.chars().count() > MAX_MESSAGE_LEN {
            return Err(AppError::validation(format!(
                "Notification message must be at most {MAX_MESSAGE_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Materialize the record the way the remote store would.
    pub fn into_notification(self, id: NotificationId, created_at: DateTime<Utc>) -> Notification {
        Notification {
            id,
            kind: self.kind,
            title: self.title,
            message: self.message,
            user_id: self.user_id,
            data: self.data,
            is_read: false,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_fields() {
        let ok = NewNotification::new(NotificationType::Emergency, "Cardiac arrest", "Bay 3");
        assert!(ok.validate().is_ok());

        let no_title = NewNotification::new(NotificationType::Emergency, "  ", "Bay 3");
        assert!(no_title.validate().is_err());

        let no_message = NewNotification::new(NotificationType::System, "Maintenance", "");
        assert!(no_message.validate().is_err());
    }

    #[test]
    fn test_validate_caps_lengths() {
        let longest = NewNotification::new(
            NotificationType::Alert,
            "t".repeat(MAX_TITLE_LEN),
            "é".repeat(MAX_MESSAGE_LEN),
        );
        assert!(longest.validate().is_ok());

        let long_title = NewNotification::new(
            NotificationType::Alert,
            "t".repeat(MAX_TITLE_LEN + 1),
            "Bay 3",
        );
        assert!(long_title.validate().is_err());

        // A 9000-byte body used to be rejected by the insert trigger.
        let long_message =
            NewNotification::new(NotificationType::System, "Handover", "x".repeat(9000));
        let err = long_message.validate().unwrap_err();
        assert_eq!(err.kind, carehub_core::error::ErrorKind::Validation);
    }

    #[test]
    fn test_deserialize_row_json() {
        // Row shape as serialized by to_jsonb() in PostgreSQL.
        let json = serde_json::json!({
            "id": "0190a0a4-7c2b-7b7e-9a55-3c1f2d7c9e01",
            "type": "alert",
            "title": "ICU capacity",
            "message": "2 beds left",
            "user_id": null,
            "data": {"ward": "ICU"},
            "is_read": false,
            "created_at": "2026-10-18T08:30:00Z"
        });
        let notification: Notification = serde_json::from_value(json).unwrap();
        assert_eq!(notification.kind, NotificationType::Alert);
        assert!(notification.is_unread());
        assert!(notification.user_id.is_none());
        assert_eq!(notification.data["ward"], "ICU");
    }

    #[test]
    fn test_visibility() {
        let alice = UserId::new();
        let bob = UserId::new();
        let record = NewNotification::new(NotificationType::Appointment, "Consult", "10:00")
            .for_user(alice)
            .into_notification(NotificationId::new(), Utc::now());

        assert!(record.is_visible_to(Some(alice)));
        assert!(!record.is_visible_to(Some(bob)));
        assert!(record.is_visible_to(None));

        let broadcast = NewNotification::new(NotificationType::System, "Downtime", "02:00")
            .into_notification(NotificationId::new(), Utc::now());
        assert!(broadcast.is_visible_to(Some(bob)));
    }
}

//! Notification domain entities.

pub mod kind;
pub mod model;

pub use kind::{NotificationType, Urgency};
pub use model::{MAX_MESSAGE_LEN, MAX_TITLE_LEN, NewNotification, Notification};

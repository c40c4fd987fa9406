//! Repository implementations for CareHub entities.

pub mod notification;

pub use notification::NotificationRepository;

//! # carehub-database
//!
//! PostgreSQL connection management, schema migrations, the notification
//! repository, and the `LISTEN/NOTIFY` listener that carries insert events.

pub mod connection;
pub mod listener;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use listener::NotificationListener;
pub use repositories::NotificationRepository;

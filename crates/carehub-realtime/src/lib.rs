//! # carehub-realtime
//!
//! Notification delivery and read-state reconciliation for CareHub:
//!
//! - [`NotificationStore`]: the in-memory snapshot the UI renders from
//! - [`SyncEngine`]: coalesced pulls from the remote table plus the live insert feed
//! - [`ReadStateMutator`]: confirm-then-refetch "mark as read"
//! - [`FeedSubscription`]: RAII handle owning the live feed for one UI context
//! - [`NotificationCenter`]: facade bundling the above

pub mod alert;
pub mod center;
pub mod feed;
pub mod metrics;
pub mod store;
pub mod sync;
pub mod table;

pub use alert::{Alert, AlertSink};
pub use center::NotificationCenter;
pub use feed::{FeedSubscription, LiveFeed, SubscriptionOptions};
pub use store::NotificationStore;
pub use sync::{PullOutcome, ReadConfirmation, ReadStateMutator, SyncEngine, SyncStatus};
pub use table::{NotificationTable, UpdateOutcome};

//! Pull/push reconciliation and read-state mutation.

pub mod engine;
pub mod mutator;

pub use engine::{PullOutcome, SyncEngine, SyncStatus};
pub use mutator::{ReadConfirmation, ReadStateMutator};

pub mod action_queue;
pub mod outbox_policy;
pub mod sync_engine;
pub mod sync_scheduler;

pub use action_queue::ActionQueue;
pub use sync_engine::{DrainOutcome, DrainSummary, DroppedAction, SyncEngine};
pub use sync_scheduler::SyncScheduler;

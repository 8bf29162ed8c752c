pub mod pending_action_store;
mod rows;

pub use pending_action_store::SqlitePendingActionStore;

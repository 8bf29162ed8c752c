pub mod base_progress;
pub mod pending_action;

pub use base_progress::{BaseProgress, BaseStatus, SubmissionReview};
pub use pending_action::{ActionKind, ActionStatus, PendingAction};

use crate::domain::entities::PendingAction;
use crate::domain::value_objects::{ActionId, BaseId, ChallengeId, GameId, MediaRef};
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Durable collection of queued actions. Every mutation persists before the
/// call returns, so process death never loses an accepted action. Mutations
/// on unknown ids are no-ops, not errors.
///
/// Ordering of `all`/`for_game` is unspecified; prioritization is the outbox
/// policy's job.
#[async_trait]
pub trait PendingActionStore: Send + Sync {
    /// Inserts the action. Returns `false` (and persists nothing) when the
    /// action is a check-in and one is already queued for the same
    /// `(game_id, base_id)` pair.
    async fn enqueue(&self, action: PendingAction) -> Result<bool, AppError>;

    async fn all(&self) -> Result<Vec<PendingAction>, AppError>;

    async fn for_game(&self, game_id: &GameId) -> Result<Vec<PendingAction>, AppError>;

    async fn get(&self, id: &ActionId) -> Result<Option<PendingAction>, AppError>;

    async fn remove(&self, id: &ActionId) -> Result<(), AppError>;

    /// Bumps the retry counter and returns the new count, or `None` when the
    /// action no longer exists.
    async fn increment_retry(&self, id: &ActionId) -> Result<Option<u32>, AppError>;

    /// Parks a media action until the user re-attaches a file. The message is
    /// kept on the action for the UI.
    async fn mark_needs_reselect(&self, id: &ActionId, message: &str) -> Result<(), AppError>;

    /// Re-attaches media to a parked action and puts it back in the queue
    /// with a fresh retry budget.
    async fn requeue_with_media(&self, id: &ActionId, media: MediaRef) -> Result<(), AppError>;

    async fn has_pending_submission(
        &self,
        base_id: &BaseId,
        challenge_id: &ChallengeId,
    ) -> Result<bool, AppError>;

    async fn pending_count(&self) -> Result<u32, AppError>;

    async fn clear(&self) -> Result<(), AppError>;

    async fn clear_for_game(&self, game_id: &GameId) -> Result<(), AppError>;
}

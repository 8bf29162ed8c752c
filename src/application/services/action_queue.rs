use crate::application::ports::{PendingActionStore, ProgressCache};
use crate::domain::entities::{ActionStatus, PendingAction};
use crate::domain::value_objects::{ActionId, BaseId, ChallengeId, GameId, MediaRef};
use crate::shared::error::AppError;
use std::sync::Arc;

/// Enqueue-side facade: persists an action and updates the local progress
/// cache in the same call, before any network attempt, so the UI reflects a
/// check-in or submission immediately. Draining is the sync engine's job.
pub struct ActionQueue {
    store: Arc<dyn PendingActionStore>,
    progress: Arc<dyn ProgressCache>,
}

impl ActionQueue {
    pub fn new(store: Arc<dyn PendingActionStore>, progress: Arc<dyn ProgressCache>) -> Self {
        Self { store, progress }
    }

    /// Queues a check-in. Returns `None` when a check-in for the same
    /// `(game, base)` pair is already queued; the progress cache is updated
    /// either way, since the base counts as checked in from the player's
    /// point of view.
    pub async fn enqueue_check_in(
        &self,
        game_id: GameId,
        base_id: BaseId,
    ) -> Result<Option<ActionId>, AppError> {
        let action = PendingAction::check_in(game_id, base_id);
        let id = action.id;
        let inserted = self.store.enqueue(action).await?;
        self.progress.mark_checked_in(&game_id, &base_id).await;
        if !inserted {
            tracing::debug!(%game_id, %base_id, "check-in already queued, skipping duplicate");
            return Ok(None);
        }
        Ok(Some(id))
    }

    /// Queues a text answer. The returned id is the idempotency key the
    /// server will see.
    pub async fn enqueue_submission(
        &self,
        game_id: GameId,
        base_id: BaseId,
        challenge_id: ChallengeId,
        answer: String,
    ) -> Result<ActionId, AppError> {
        let action = PendingAction::text_submission(game_id, base_id, challenge_id, answer);
        let id = action.id;
        self.store.enqueue(action).await?;
        self.progress.mark_submitted(&game_id, &base_id).await;
        Ok(id)
    }

    pub async fn enqueue_media_submission(
        &self,
        game_id: GameId,
        base_id: BaseId,
        challenge_id: ChallengeId,
        notes: Option<String>,
        media: MediaRef,
    ) -> Result<ActionId, AppError> {
        let action =
            PendingAction::media_submission(game_id, base_id, challenge_id, notes, media);
        let id = action.id;
        self.store.enqueue(action).await?;
        self.progress.mark_submitted(&game_id, &base_id).await;
        Ok(id)
    }

    /// Queued work, polled by the UI at low frequency.
    pub async fn pending_count(&self) -> Result<u32, AppError> {
        self.store.pending_count().await
    }

    /// Media actions parked for re-attachment, so the UI can prompt the
    /// player instead of silently stalling.
    pub async fn needs_reselect(&self, game_id: GameId) -> Result<Vec<PendingAction>, AppError> {
        let actions = self.store.for_game(&game_id).await?;
        Ok(actions
            .into_iter()
            .filter(|a| a.status == ActionStatus::NeedsReselect)
            .collect())
    }

    /// Re-attaches freshly selected media to a parked action and returns it
    /// to the queue with a clean retry budget.
    pub async fn reattach_media(&self, id: ActionId, media: MediaRef) -> Result<(), AppError> {
        self.store.requeue_with_media(&id, media).await
    }

    pub async fn has_pending_submission(
        &self,
        base_id: BaseId,
        challenge_id: ChallengeId,
    ) -> Result<bool, AppError> {
        self.store.has_pending_submission(&base_id, &challenge_id).await
    }

    /// Game exit: forget everything queued for that game.
    pub async fn clear_for_game(&self, game_id: GameId) -> Result<(), AppError> {
        self.store.clear_for_game(&game_id).await?;
        self.progress.clear_for_game(&game_id).await;
        Ok(())
    }

    /// Logout: forget everything.
    pub async fn clear_all(&self) -> Result<(), AppError> {
        self.store.clear().await?;
        self.progress.clear().await;
        Ok(())
    }
}

use crate::domain::entities::BaseProgress;
use crate::domain::value_objects::{BaseId, GameId};
use async_trait::async_trait;

/// Read-side per-base status consumed by the UI. Written optimistically at
/// enqueue time; replaced wholesale when the caller refreshes server truth
/// after a drain.
#[async_trait]
pub trait ProgressCache: Send + Sync {
    async fn mark_checked_in(&self, game_id: &GameId, base_id: &BaseId);

    /// Sets "submitted, pending review".
    async fn mark_submitted(&self, game_id: &GameId, base_id: &BaseId);

    async fn status(&self, game_id: &GameId, base_id: &BaseId) -> Option<BaseProgress>;

    async fn for_game(&self, game_id: &GameId) -> Vec<BaseProgress>;

    async fn replace_for_game(&self, game_id: &GameId, progress: Vec<BaseProgress>);

    async fn clear_for_game(&self, game_id: &GameId);

    async fn clear(&self);
}

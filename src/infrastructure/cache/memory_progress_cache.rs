use crate::application::ports::ProgressCache;
use crate::domain::entities::{BaseProgress, BaseStatus, SubmissionReview};
use crate::domain::value_objects::{BaseId, GameId};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory read-side progress. Optimistic writes land here synchronously
/// at enqueue time; server truth overwrites entries wholesale when the
/// caller refreshes after a drain.
#[derive(Default)]
pub struct MemoryProgressCache {
    entries: RwLock<HashMap<(GameId, BaseId), BaseProgress>>,
}

impl MemoryProgressCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressCache for MemoryProgressCache {
    async fn mark_checked_in(&self, game_id: &GameId, base_id: &BaseId) {
        let mut entries = self.entries.write().await;
        entries
            .entry((*game_id, *base_id))
            .and_modify(|p| {
                // A submission already implies a check-in; never downgrade.
                if p.status == BaseStatus::NotVisited {
                    p.status = BaseStatus::CheckedIn;
                    p.updated_at = Utc::now();
                }
            })
            .or_insert_with(|| BaseProgress::new(*game_id, *base_id, BaseStatus::CheckedIn));
    }

    async fn mark_submitted(&self, game_id: &GameId, base_id: &BaseId) {
        let mut entries = self.entries.write().await;
        let progress = BaseProgress::new(*game_id, *base_id, BaseStatus::Submitted)
            .with_submission_status(SubmissionReview::Pending);
        entries.insert((*game_id, *base_id), progress);
    }

    async fn status(&self, game_id: &GameId, base_id: &BaseId) -> Option<BaseProgress> {
        self.entries
            .read()
            .await
            .get(&(*game_id, *base_id))
            .cloned()
    }

    async fn for_game(&self, game_id: &GameId) -> Vec<BaseProgress> {
        self.entries
            .read()
            .await
            .values()
            .filter(|p| p.game_id == *game_id)
            .cloned()
            .collect()
    }

    async fn replace_for_game(&self, game_id: &GameId, progress: Vec<BaseProgress>) {
        let mut entries = self.entries.write().await;
        entries.retain(|(g, _), _| g != game_id);
        for p in progress {
            entries.insert((p.game_id, p.base_id), p);
        }
    }

    async fn clear_for_game(&self, game_id: &GameId) {
        self.entries
            .write()
            .await
            .retain(|(g, _), _| g != game_id);
    }

    async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

use crate::domain::value_objects::{BaseId, GameId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read-side status of a base as the player sees it. Updated optimistically
/// at enqueue time; reconciled with server truth only by the caller's full
/// refresh after a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseStatus {
    NotVisited,
    CheckedIn,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionReview {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseProgress {
    pub game_id: GameId,
    pub base_id: BaseId,
    pub status: BaseStatus,
    pub submission_status: Option<SubmissionReview>,
    pub updated_at: DateTime<Utc>,
}

impl BaseProgress {
    pub fn new(game_id: GameId, base_id: BaseId, status: BaseStatus) -> Self {
        Self {
            game_id,
            base_id,
            status,
            submission_status: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_submission_status(mut self, review: SubmissionReview) -> Self {
        self.submission_status = Some(review);
        self
    }
}

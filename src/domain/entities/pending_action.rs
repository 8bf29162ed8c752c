use crate::domain::value_objects::{ActionId, BaseId, ChallengeId, GameId, MediaRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of player action is queued. Check-ins rank before submissions
/// when a batch is drained because a submission may be rejected server-side
/// without a prior check-in at the same base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CheckIn,
    TextSubmission,
    MediaSubmission,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CheckIn => "check_in",
            ActionKind::TextSubmission => "text_submission",
            ActionKind::MediaSubmission => "media_submission",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "check_in" => Ok(ActionKind::CheckIn),
            "text_submission" => Ok(ActionKind::TextSubmission),
            "media_submission" => Ok(ActionKind::MediaSubmission),
            other => Err(format!("Unknown action kind: {other}")),
        }
    }
}

/// Persisted lifecycle state. There is deliberately no `Syncing` variant:
/// a sync attempt is transactional within one drain, so an action is either
/// still queued or already gone when the process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Queued,
    /// Media bytes could not be resolved; parked until the user re-attaches
    /// a file. Never auto-attempted.
    NeedsReselect,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Queued => "queued",
            ActionStatus::NeedsReselect => "needs_reselect",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "queued" => Ok(ActionStatus::Queued),
            "needs_reselect" => Ok(ActionStatus::NeedsReselect),
            other => Err(format!("Unknown action status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: ActionId,
    pub kind: ActionKind,
    pub game_id: GameId,
    pub base_id: BaseId,
    pub challenge_id: Option<ChallengeId>,
    pub answer: Option<String>,
    pub media: Option<MediaRef>,
    pub status: ActionStatus,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl PendingAction {
    pub fn check_in(game_id: GameId, base_id: BaseId) -> Self {
        Self::new(ActionKind::CheckIn, game_id, base_id, None, None, None)
    }

    pub fn text_submission(
        game_id: GameId,
        base_id: BaseId,
        challenge_id: ChallengeId,
        answer: String,
    ) -> Self {
        Self::new(
            ActionKind::TextSubmission,
            game_id,
            base_id,
            Some(challenge_id),
            Some(answer),
            None,
        )
    }

    pub fn media_submission(
        game_id: GameId,
        base_id: BaseId,
        challenge_id: ChallengeId,
        notes: Option<String>,
        media: MediaRef,
    ) -> Self {
        Self::new(
            ActionKind::MediaSubmission,
            game_id,
            base_id,
            Some(challenge_id),
            notes,
            Some(media),
        )
    }

    fn new(
        kind: ActionKind,
        game_id: GameId,
        base_id: BaseId,
        challenge_id: Option<ChallengeId>,
        answer: Option<String>,
        media: Option<MediaRef>,
    ) -> Self {
        Self {
            id: ActionId::generate(),
            kind,
            game_id,
            base_id,
            challenge_id,
            answer,
            media,
            status: ActionStatus::Queued,
            retry_count: 0,
            created_at: Utc::now(),
            last_error: None,
        }
    }

    pub fn is_check_in(&self) -> bool {
        self.kind == ActionKind::CheckIn
    }

    /// The action id doubles as the idempotency key sent to the server.
    pub fn idempotency_key(&self) -> ActionId {
        self.id
    }
}

use crate::domain::entities::{ActionKind, ActionStatus, PendingAction};
use crate::domain::value_objects::{ActionId, BaseId, ChallengeId, GameId, MediaRef};
use crate::shared::error::AppError;
use chrono::{TimeZone, Utc};
use sqlx::FromRow;

/// Raw `pending_actions` row. Column names are the serialized contract:
/// actions queued before an app update must still load after it.
#[derive(Debug, Clone, FromRow)]
pub struct PendingActionRow {
    pub id: String,
    pub kind: String,
    pub game_id: String,
    pub base_id: String,
    pub challenge_id: Option<String>,
    pub answer: Option<String>,
    pub media: Option<String>,
    pub status: String,
    pub retry_count: i64,
    pub created_at: i64,
    pub last_error: Option<String>,
}

impl TryFrom<PendingActionRow> for PendingAction {
    type Error = AppError;

    fn try_from(row: PendingActionRow) -> Result<Self, Self::Error> {
        let media: Option<MediaRef> = row
            .media
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let created_at = Utc
            .timestamp_millis_opt(row.created_at)
            .single()
            .ok_or_else(|| {
                AppError::Serialization(format!("invalid created_at: {}", row.created_at))
            })?;

        Ok(PendingAction {
            id: ActionId::parse(&row.id).map_err(AppError::Serialization)?,
            kind: ActionKind::parse(&row.kind).map_err(AppError::Serialization)?,
            game_id: GameId::parse(&row.game_id).map_err(AppError::Serialization)?,
            base_id: BaseId::parse(&row.base_id).map_err(AppError::Serialization)?,
            challenge_id: row
                .challenge_id
                .as_deref()
                .map(ChallengeId::parse)
                .transpose()
                .map_err(AppError::Serialization)?,
            answer: row.answer,
            media,
            status: ActionStatus::parse(&row.status).map_err(AppError::Serialization)?,
            retry_count: u32::try_from(row.retry_count.max(0)).unwrap_or(u32::MAX),
            created_at,
            last_error: row.last_error,
        })
    }
}

pub fn media_json(action: &PendingAction) -> Result<Option<String>, AppError> {
    action
        .media
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(AppError::from)
}

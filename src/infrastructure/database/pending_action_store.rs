use super::rows::{media_json, PendingActionRow};
use crate::application::ports::PendingActionStore;
use crate::domain::entities::{ActionKind, ActionStatus, PendingAction};
use crate::domain::value_objects::{ActionId, BaseId, ChallengeId, GameId, MediaRef};
use crate::shared::error::AppError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;

/// SQLite-backed pending-action store. Every mutation commits before the
/// call returns; the connection pool serializes the occasional enqueue from
/// user-action context against the sync engine's drain without corrupting
/// the collection.
pub struct SqlitePendingActionStore {
    pool: SqlitePool,
}

impl SqlitePendingActionStore {
    pub async fn open(path: &Path, max_connections: u32) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self, AppError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Opens the on-disk queue, degrading to an empty in-memory queue when
    /// the file cannot be opened or migrated. Losing queued actions is
    /// preferred over a permanently broken queue, so the failure is logged
    /// as recoverable instead of propagated.
    pub async fn open_or_recover(path: &Path, max_connections: u32) -> Result<Self, AppError> {
        match Self::open(path, max_connections).await {
            Ok(store) => Ok(store),
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "failed to open pending-action store, starting with an empty in-memory queue"
                );
                Self::in_memory().await
            }
        }
    }

    async fn fetch_actions(&self, query: &str, game_id: Option<&GameId>) -> Result<Vec<PendingAction>, AppError> {
        let mut q = sqlx::query_as::<_, PendingActionRow>(query);
        if let Some(game_id) = game_id {
            q = q.bind(game_id.to_string());
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(PendingAction::try_from).collect()
    }
}

#[async_trait]
impl PendingActionStore for SqlitePendingActionStore {
    async fn enqueue(&self, action: PendingAction) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        if action.kind == ActionKind::CheckIn {
            let existing = sqlx::query(
                "SELECT 1 FROM pending_actions WHERE kind = 'check_in' AND game_id = ?1 AND base_id = ?2 LIMIT 1",
            )
            .bind(action.game_id.to_string())
            .bind(action.base_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
            if existing.is_some() {
                return Ok(false);
            }
        }

        sqlx::query(
            r#"
            INSERT INTO pending_actions (
                id, kind, game_id, base_id, challenge_id, answer,
                media, status, retry_count, created_at, last_error
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(action.id.to_string())
        .bind(action.kind.as_str())
        .bind(action.game_id.to_string())
        .bind(action.base_id.to_string())
        .bind(action.challenge_id.map(|c| c.to_string()))
        .bind(&action.answer)
        .bind(media_json(&action)?)
        .bind(action.status.as_str())
        .bind(i64::from(action.retry_count))
        .bind(action.created_at.timestamp_millis())
        .bind(&action.last_error)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn all(&self) -> Result<Vec<PendingAction>, AppError> {
        self.fetch_actions("SELECT * FROM pending_actions", None).await
    }

    async fn for_game(&self, game_id: &GameId) -> Result<Vec<PendingAction>, AppError> {
        self.fetch_actions("SELECT * FROM pending_actions WHERE game_id = ?1", Some(game_id))
            .await
    }

    async fn get(&self, id: &ActionId) -> Result<Option<PendingAction>, AppError> {
        let row = sqlx::query_as::<_, PendingActionRow>(
            "SELECT * FROM pending_actions WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(PendingAction::try_from).transpose()
    }

    async fn remove(&self, id: &ActionId) -> Result<(), AppError> {
        sqlx::query("DELETE FROM pending_actions WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn increment_retry(&self, id: &ActionId) -> Result<Option<u32>, AppError> {
        let row = sqlx::query(
            "UPDATE pending_actions SET retry_count = retry_count + 1 WHERE id = ?1 RETURNING retry_count",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => {
                let count: i64 = row.try_get("retry_count")?;
                Ok(Some(u32::try_from(count.max(0)).unwrap_or(u32::MAX)))
            }
            None => Ok(None),
        }
    }

    async fn mark_needs_reselect(&self, id: &ActionId, message: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE pending_actions SET status = ?1, last_error = ?2 WHERE id = ?3",
        )
        .bind(ActionStatus::NeedsReselect.as_str())
        .bind(message)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn requeue_with_media(&self, id: &ActionId, media: MediaRef) -> Result<(), AppError> {
        let media = serde_json::to_string(&media)?;
        sqlx::query(
            r#"
            UPDATE pending_actions
            SET media = ?1, status = ?2, retry_count = 0, last_error = NULL
            WHERE id = ?3
            "#,
        )
        .bind(media)
        .bind(ActionStatus::Queued.as_str())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn has_pending_submission(
        &self,
        base_id: &BaseId,
        challenge_id: &ChallengeId,
    ) -> Result<bool, AppError> {
        let row = sqlx::query(
            r#"
            SELECT 1 FROM pending_actions
            WHERE base_id = ?1 AND challenge_id = ?2
              AND kind IN ('text_submission', 'media_submission')
            LIMIT 1
            "#,
        )
        .bind(base_id.to_string())
        .bind(challenge_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn pending_count(&self) -> Result<u32, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM pending_actions")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(u32::try_from(count.max(0)).unwrap_or(u32::MAX))
    }

    async fn clear(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM pending_actions")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_for_game(&self, game_id: &GameId) -> Result<(), AppError> {
        sqlx::query("DELETE FROM pending_actions WHERE game_id = ?1")
            .bind(game_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

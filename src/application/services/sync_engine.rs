use crate::application::ports::remote_gateway::GatewayError;
use crate::application::ports::{AuthProvider, MediaSource, PendingActionStore, RemoteGateway};
use crate::application::services::outbox_policy::{self, FailureKind};
use crate::domain::entities::{ActionKind, ActionStatus, PendingAction};
use crate::domain::value_objects::{AccessToken, ActionId, GameId};
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Async hook invoked exactly once per drain cycle. Callers use it to pull
/// server-truth progress after the queue has been applied.
pub type DrainCompleteHook = Arc<dyn Fn(DrainSummary) -> BoxFuture<'static, ()> + Send + Sync>;

/// What one drain cycle did to the queue. Dropped actions are listed rather
/// than silently discarded so the caller can tell the player about data loss.
#[derive(Debug, Clone, Default)]
pub struct DrainSummary {
    pub attempted: u32,
    pub synced: u32,
    pub retried: u32,
    /// Actions skipped without a network attempt (parked media).
    pub skipped: u32,
    pub dropped: Vec<DroppedAction>,
    /// The batch was paused by a 401/403 or a missing token; remaining
    /// actions are untouched and wait for re-authentication.
    pub auth_expired: bool,
}

#[derive(Debug, Clone)]
pub struct DroppedAction {
    pub id: ActionId,
    pub kind: ActionKind,
    pub reason: String,
}

#[derive(Debug)]
pub enum DrainOutcome {
    Completed(DrainSummary),
    /// A drain was already running; this trigger was coalesced into a no-op.
    AlreadyDraining,
}

enum Dispatch {
    Synced,
    /// Media bytes were unavailable; the action was parked as NeedsReselect.
    Parked,
    /// The persisted action can never be sent (missing fields). Dropped.
    Invalid(String),
}

/// Drains the pending-action store through the remote gateway, one action at
/// a time, applying the outbox policy. One logical worker per device: a
/// single-flight guard coalesces overlapping triggers, and actions within a
/// drain run strictly sequentially to keep check-ins ahead of submissions.
pub struct SyncEngine {
    store: Arc<dyn PendingActionStore>,
    gateway: Arc<dyn RemoteGateway>,
    auth: Arc<dyn AuthProvider>,
    media: Arc<dyn MediaSource>,
    config: SyncConfig,
    drain_lock: Mutex<()>,
    on_drain_complete: RwLock<Option<DrainCompleteHook>>,
    last_error: RwLock<Option<String>>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn PendingActionStore>,
        gateway: Arc<dyn RemoteGateway>,
        auth: Arc<dyn AuthProvider>,
        media: Arc<dyn MediaSource>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            auth,
            media,
            config,
            drain_lock: Mutex::new(()),
            on_drain_complete: RwLock::new(None),
            last_error: RwLock::new(None),
        }
    }

    pub async fn set_on_drain_complete(&self, hook: DrainCompleteHook) {
        *self.on_drain_complete.write().await = Some(hook);
    }

    /// Last drain-level problem, for surfacing in the UI. Cleared at the
    /// start of every drain.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    /// Fire-and-forget trigger. Safe to call redundantly from any trigger
    /// source; overlapping calls coalesce on the single-flight guard.
    pub fn trigger_sync(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.drain().await;
        });
    }

    pub async fn drain(&self) -> DrainOutcome {
        self.drain_scoped(None).await
    }

    pub async fn drain_game(&self, game_id: GameId) -> DrainOutcome {
        self.drain_scoped(Some(game_id)).await
    }

    async fn drain_scoped(&self, scope: Option<GameId>) -> DrainOutcome {
        let Ok(_guard) = self.drain_lock.try_lock() else {
            tracing::debug!("drain already in progress, coalescing trigger");
            return DrainOutcome::AlreadyDraining;
        };

        *self.last_error.write().await = None;
        let mut summary = DrainSummary::default();

        let seen = self.drain_pass(scope.as_ref(), &mut summary).await;

        // If enqueues raced this pass, run exactly one follow-up; its
        // snapshot covers everything outstanding, so one is enough.
        if !summary.auth_expired {
            if let Some(seen) = seen {
                if self.has_unseen_actions(scope.as_ref(), &seen).await {
                    tracing::debug!("actions enqueued during drain, running follow-up pass");
                    self.drain_pass(scope.as_ref(), &mut summary).await;
                }
            }
        }

        if summary.auth_expired {
            *self.last_error.write().await =
                Some("authentication expired, sync paused".to_string());
        } else if !summary.dropped.is_empty() {
            *self.last_error.write().await = Some(format!(
                "{} action(s) could not be delivered and were dropped",
                summary.dropped.len()
            ));
        }

        tracing::info!(
            attempted = summary.attempted,
            synced = summary.synced,
            retried = summary.retried,
            skipped = summary.skipped,
            dropped = summary.dropped.len(),
            auth_expired = summary.auth_expired,
            "drain cycle finished"
        );

        let hook = self.on_drain_complete.read().await.clone();
        if let Some(hook) = hook {
            hook(summary.clone()).await;
        }

        DrainOutcome::Completed(summary)
    }

    async fn snapshot(&self, scope: Option<&GameId>) -> Result<Vec<PendingAction>, AppError> {
        match scope {
            Some(game_id) => self.store.for_game(game_id).await,
            None => self.store.all().await,
        }
    }

    async fn has_unseen_actions(&self, scope: Option<&GameId>, seen: &HashSet<ActionId>) -> bool {
        match self.snapshot(scope).await {
            Ok(remaining) => remaining.iter().any(|a| !seen.contains(&a.id)),
            Err(e) => {
                tracing::error!(error = %e, "failed to re-check store after drain pass");
                false
            }
        }
    }

    /// One ordered pass over a snapshot of the store. Returns the ids that
    /// were in the snapshot, or `None` when the snapshot itself failed.
    async fn drain_pass(
        &self,
        scope: Option<&GameId>,
        summary: &mut DrainSummary,
    ) -> Option<HashSet<ActionId>> {
        let snapshot = match self.snapshot(scope).await {
            Ok(actions) => actions,
            Err(e) => {
                tracing::error!(error = %e, "failed to snapshot pending actions");
                return None;
            }
        };
        let seen: HashSet<ActionId> = snapshot.iter().map(|a| a.id).collect();

        for action in outbox_policy::prioritize(snapshot) {
            if !outbox_policy::should_attempt(&action, self.config.max_retries) {
                if action.status == ActionStatus::NeedsReselect {
                    summary.skipped += 1;
                    continue;
                }
                // Already at the retry cap (e.g. persisted from an earlier
                // run): remove instead of attempting forever.
                self.drop_action(&action, "retry limit reached", summary)
                    .await;
                continue;
            }

            if action.retry_count > 0 {
                let delay =
                    outbox_policy::backoff_delay(action.retry_count, self.config.base_backoff());
                tokio::time::sleep(delay).await;
            }

            let Some(token) = self.auth.current_token() else {
                tracing::warn!("no auth token available, pausing drain");
                summary.auth_expired = true;
                break;
            };

            match self.dispatch(&action, &token).await {
                Ok(Dispatch::Synced) => {
                    summary.attempted += 1;
                    self.finish_action(&action, summary).await;
                }
                Ok(Dispatch::Parked) => {
                    summary.skipped += 1;
                }
                Ok(Dispatch::Invalid(reason)) => {
                    self.drop_action(&action, &reason, summary).await;
                }
                Err(err) => {
                    summary.attempted += 1;
                    match outbox_policy::classify(&err) {
                        FailureKind::Retry => {
                            self.handle_retryable(&action, &err, summary).await;
                        }
                        FailureKind::Permanent => {
                            self.drop_action(&action, &err.to_string(), summary).await;
                        }
                        FailureKind::AuthExpired => {
                            tracing::warn!(action_id = %action.id, "auth expired, pausing drain");
                            summary.auth_expired = true;
                            break;
                        }
                    }
                }
            }
        }

        Some(seen)
    }

    async fn dispatch(
        &self,
        action: &PendingAction,
        token: &AccessToken,
    ) -> Result<Dispatch, GatewayError> {
        match action.kind {
            ActionKind::CheckIn => {
                self.gateway
                    .check_in(&action.game_id, &action.base_id, token)
                    .await?;
                Ok(Dispatch::Synced)
            }
            ActionKind::TextSubmission => {
                let (Some(challenge_id), Some(answer)) = (&action.challenge_id, &action.answer)
                else {
                    return Ok(Dispatch::Invalid(
                        "text submission is missing challenge or answer".to_string(),
                    ));
                };
                self.gateway
                    .submit_answer(
                        &action.game_id,
                        &action.base_id,
                        challenge_id,
                        answer,
                        &action.idempotency_key(),
                        token,
                    )
                    .await?;
                Ok(Dispatch::Synced)
            }
            ActionKind::MediaSubmission => {
                let Some(challenge_id) = &action.challenge_id else {
                    return Ok(Dispatch::Invalid(
                        "media submission is missing its challenge".to_string(),
                    ));
                };
                let Some(media) = &action.media else {
                    return Ok(Dispatch::Invalid(
                        "media submission has no media reference".to_string(),
                    ));
                };
                let bytes = match self.media.load(media).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        // Bytes are gone; never hit the network. Park the
                        // action so the UI can prompt for re-selection.
                        tracing::warn!(action_id = %action.id, error = %e, "media unavailable, parking action");
                        if let Err(store_err) = self
                            .store
                            .mark_needs_reselect(
                                &action.id,
                                "Media source unavailable. Please reselect.",
                            )
                            .await
                        {
                            tracing::error!(action_id = %action.id, error = %store_err, "failed to park media action");
                        }
                        return Ok(Dispatch::Parked);
                    }
                };
                self.gateway
                    .submit_photo(
                        &action.game_id,
                        &action.base_id,
                        challenge_id,
                        bytes,
                        action.answer.as_deref(),
                        &action.idempotency_key(),
                        token,
                    )
                    .await?;
                Ok(Dispatch::Synced)
            }
        }
    }

    async fn handle_retryable(
        &self,
        action: &PendingAction,
        err: &GatewayError,
        summary: &mut DrainSummary,
    ) {
        match self.store.increment_retry(&action.id).await {
            Ok(Some(new_count)) if new_count >= self.config.max_retries => {
                // Deliberate data-loss tradeoff: dropping beats an unbounded
                // queue of permanently unreachable actions.
                self.drop_action(
                    action,
                    &format!("gave up after {new_count} network failures"),
                    summary,
                )
                .await;
            }
            Ok(Some(new_count)) => {
                summary.retried += 1;
                tracing::info!(
                    action_id = %action.id,
                    retry_count = new_count,
                    error = %err,
                    "network error, will retry"
                );
            }
            Ok(None) => {
                // Removed concurrently (logout or game exit). Nothing to do.
            }
            Err(store_err) => {
                tracing::error!(action_id = %action.id, error = %store_err, "failed to bump retry count");
            }
        }
    }

    async fn finish_action(&self, action: &PendingAction, summary: &mut DrainSummary) {
        if let Err(e) = self.store.remove(&action.id).await {
            tracing::error!(action_id = %action.id, error = %e, "failed to remove synced action");
            return;
        }
        if let Some(media) = &action.media {
            self.media.discard_local_copy(media).await;
        }
        summary.synced += 1;
        tracing::info!(
            action_id = %action.id,
            kind = action.kind.as_str(),
            base_id = %action.base_id,
            "synced pending action"
        );
    }

    async fn drop_action(&self, action: &PendingAction, reason: &str, summary: &mut DrainSummary) {
        if let Err(e) = self.store.remove(&action.id).await {
            tracing::error!(action_id = %action.id, error = %e, "failed to drop action");
            return;
        }
        if let Some(media) = &action.media {
            self.media.discard_local_copy(media).await;
        }
        tracing::warn!(
            action_id = %action.id,
            kind = action.kind.as_str(),
            reason,
            "dropped pending action"
        );
        summary.dropped.push(DroppedAction {
            id: action.id,
            kind: action.kind,
            reason: reason.to_string(),
        });
    }
}

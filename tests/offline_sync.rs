use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use futures::FutureExt;
use pointfinder_sync::application::ports::remote_gateway::{
    CheckInConfirmation, GatewayError, RemoteGateway, SubmissionConfirmation,
};
use pointfinder_sync::application::ports::{AuthProvider, PendingActionStore, ProgressCache};
use pointfinder_sync::infrastructure::cache::MemoryProgressCache;
use pointfinder_sync::infrastructure::database::SqlitePendingActionStore;
use pointfinder_sync::infrastructure::media::FsMediaSource;
use pointfinder_sync::{
    AccessToken, ActionId, ActionQueue, ActionStatus, BaseId, BaseStatus, ChallengeId,
    DrainOutcome, GameId, MediaRef, PendingAction, SyncConfig, SyncEngine, SyncScheduler,
};
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

fn game() -> GameId {
    GameId::new(Uuid::new_v4())
}

fn base() -> BaseId {
    BaseId::new(Uuid::new_v4())
}

fn challenge() -> ChallengeId {
    ChallengeId::new(Uuid::new_v4())
}

fn test_config() -> SyncConfig {
    SyncConfig {
        auto_sync: false,
        sync_interval: 3600,
        max_retries: 5,
        // Keep retry tests fast; growth itself is covered by the policy's
        // unit tests.
        base_backoff_ms: 1,
    }
}

struct StaticAuth(Option<AccessToken>);

impl AuthProvider for StaticAuth {
    fn current_token(&self) -> Option<AccessToken> {
        self.0.clone()
    }
}

fn player_auth() -> Arc<StaticAuth> {
    Arc::new(StaticAuth(Some(
        AccessToken::new("player-token".into()).unwrap(),
    )))
}

/// Gateway test double: per-base scripted outcomes consumed in order, plus a
/// log of every call for ordering assertions. Unscripted calls succeed.
#[derive(Default)]
struct ScriptedGateway {
    scripts: Mutex<HashMap<BaseId, VecDeque<Result<(), GatewayError>>>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedGateway {
    fn new() -> Self {
        Self::default()
    }

    fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    async fn script(&self, base_id: BaseId, outcomes: Vec<Result<(), GatewayError>>) {
        self.scripts
            .lock()
            .await
            .insert(base_id, outcomes.into());
    }

    async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn respond(&self, verb: &str, base_id: &BaseId) -> Result<(), GatewayError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().await.push(format!("{verb}:{base_id}"));
        let mut scripts = self.scripts.lock().await;
        match scripts.get_mut(base_id).and_then(|q| q.pop_front()) {
            Some(outcome) => outcome,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteGateway for ScriptedGateway {
    async fn check_in(
        &self,
        _game_id: &GameId,
        base_id: &BaseId,
        _token: &AccessToken,
    ) -> Result<CheckInConfirmation, GatewayError> {
        self.respond("check_in", base_id).await?;
        Ok(CheckInConfirmation {
            check_in_id: Uuid::new_v4().to_string(),
        })
    }

    async fn submit_answer(
        &self,
        _game_id: &GameId,
        base_id: &BaseId,
        _challenge_id: &ChallengeId,
        _answer: &str,
        _idempotency_key: &ActionId,
        _token: &AccessToken,
    ) -> Result<SubmissionConfirmation, GatewayError> {
        self.respond("submit_answer", base_id).await?;
        Ok(SubmissionConfirmation {
            submission_id: Uuid::new_v4().to_string(),
        })
    }

    async fn submit_photo(
        &self,
        _game_id: &GameId,
        base_id: &BaseId,
        _challenge_id: &ChallengeId,
        _bytes: Vec<u8>,
        _notes: Option<&str>,
        _idempotency_key: &ActionId,
        _token: &AccessToken,
    ) -> Result<SubmissionConfirmation, GatewayError> {
        self.respond("submit_photo", base_id).await?;
        Ok(SubmissionConfirmation {
            submission_id: Uuid::new_v4().to_string(),
        })
    }
}

struct Harness {
    store: Arc<SqlitePendingActionStore>,
    queue: ActionQueue,
    engine: Arc<SyncEngine>,
    gateway: Arc<ScriptedGateway>,
}

async fn harness_with(gateway: ScriptedGateway, config: SyncConfig) -> Harness {
    let store = Arc::new(SqlitePendingActionStore::in_memory().await.unwrap());
    let progress = Arc::new(MemoryProgressCache::new());
    let gateway = Arc::new(gateway);
    let queue = ActionQueue::new(store.clone(), progress);
    let engine = Arc::new(SyncEngine::new(
        store.clone(),
        gateway.clone(),
        player_auth(),
        Arc::new(FsMediaSource::new()),
        config,
    ));
    Harness {
        store,
        queue,
        engine,
        gateway,
    }
}

async fn harness() -> Harness {
    harness_with(ScriptedGateway::new(), test_config()).await
}

fn network_err() -> Result<(), GatewayError> {
    Err(GatewayError::Network("connection reset".into()))
}

fn completed(outcome: DrainOutcome) -> pointfinder_sync::DrainSummary {
    match outcome {
        DrainOutcome::Completed(summary) => summary,
        DrainOutcome::AlreadyDraining => panic!("drain was unexpectedly coalesced"),
    }
}

#[tokio::test]
async fn enqueue_check_in_is_idempotent_per_base() {
    let h = harness().await;
    let (game_id, base_id) = (game(), base());

    let first = h.queue.enqueue_check_in(game_id, base_id).await.unwrap();
    let second = h.queue.enqueue_check_in(game_id, base_id).await.unwrap();

    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(h.queue.pending_count().await.unwrap(), 1);
}

#[tokio::test]
async fn drain_attempts_check_ins_before_older_submissions() {
    let h = harness().await;
    let game_id = game();
    let (sub_base, check_base) = (base(), base());

    // The submission is older than the check-in; kind rank must still win.
    let mut submission =
        PendingAction::text_submission(game_id, sub_base, challenge(), "ans".into());
    submission.created_at = Utc::now() - ChronoDuration::minutes(5);
    h.store.enqueue(submission).await.unwrap();
    h.store
        .enqueue(PendingAction::check_in(game_id, check_base))
        .await
        .unwrap();

    completed(h.engine.drain().await);

    let calls = h.gateway.calls().await;
    assert_eq!(
        calls,
        vec![
            format!("check_in:{check_base}"),
            format!("submit_answer:{sub_base}"),
        ]
    );
}

#[tokio::test]
async fn five_network_failures_drop_the_action() {
    let h = harness().await;
    let (game_id, base_id) = (game(), base());
    h.gateway
        .script(base_id, (0..5).map(|_| network_err()).collect())
        .await;
    h.queue.enqueue_check_in(game_id, base_id).await.unwrap();

    for attempt in 1..=4u32 {
        let summary = completed(h.engine.drain().await);
        assert_eq!(summary.retried, 1, "attempt {attempt} should retry");
        let action = &h.store.all().await.unwrap()[0];
        assert_eq!(action.retry_count, attempt);
    }

    // Fifth failure exhausts the budget and removes the action.
    let summary = completed(h.engine.drain().await);
    assert_eq!(summary.dropped.len(), 1);
    assert!(summary.dropped[0].reason.contains("network failures"));
    assert!(h.store.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn server_rejection_drops_without_spending_retry_budget() {
    let h = harness().await;
    let (game_id, base_id) = (game(), base());
    h.gateway
        .script(
            base_id,
            vec![Err(GatewayError::ServerRejected {
                status: 422,
                body: "unknown challenge".into(),
            })],
        )
        .await;
    h.queue
        .enqueue_submission(game_id, base_id, challenge(), "ans".into())
        .await
        .unwrap();

    let summary = completed(h.engine.drain().await);

    assert_eq!(summary.dropped.len(), 1);
    assert!(summary.dropped[0].reason.contains("422"));
    assert!(h.store.all().await.unwrap().is_empty());
    // Exactly one attempt: the retry budget was never touched.
    assert_eq!(h.gateway.calls().await.len(), 1);
}

#[tokio::test]
async fn auth_expiry_pauses_the_batch_without_mutating_survivors() {
    let h = harness().await;
    let game_id = game();
    let bases = [base(), base(), base()];

    for (i, base_id) in bases.iter().enumerate() {
        let mut action = PendingAction::check_in(game_id, *base_id);
        action.created_at = Utc::now() + ChronoDuration::milliseconds(i as i64);
        h.store.enqueue(action).await.unwrap();
    }
    h.gateway
        .script(bases[1], vec![Err(GatewayError::AuthExpired)])
        .await;

    let summary = completed(h.engine.drain().await);

    assert!(summary.auth_expired);
    assert_eq!(summary.synced, 1);
    // Action 1 succeeded and is gone; actions 2 and 3 are untouched.
    let remaining = h.store.all().await.unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|a| a.retry_count == 0));
    assert!(remaining.iter().all(|a| a.status == ActionStatus::Queued));
    // The third action was never attempted.
    assert_eq!(h.gateway.calls().await.len(), 2);
    assert_eq!(
        h.engine.last_error().await.as_deref(),
        Some("authentication expired, sync paused")
    );
}

#[tokio::test]
async fn missing_token_pauses_like_auth_expiry() {
    let store = Arc::new(SqlitePendingActionStore::in_memory().await.unwrap());
    let gateway = Arc::new(ScriptedGateway::new());
    let engine = SyncEngine::new(
        store.clone(),
        gateway.clone(),
        Arc::new(StaticAuth(None)),
        Arc::new(FsMediaSource::new()),
        test_config(),
    );
    store
        .enqueue(PendingAction::check_in(game(), base()))
        .await
        .unwrap();

    let summary = completed(engine.drain().await);

    assert!(summary.auth_expired);
    assert!(gateway.calls().await.is_empty());
    assert_eq!(store.pending_count().await.unwrap(), 1);
}

#[tokio::test]
async fn media_without_bytes_is_parked_not_attempted() {
    let h = harness().await;
    let dir = tempfile::tempdir().unwrap();
    let media = MediaRef::new("image/jpeg".into(), 9)
        .with_local_path(dir.path().join("vanished.jpg"));
    let id = h
        .queue
        .enqueue_media_submission(game(), base(), challenge(), None, media)
        .await
        .unwrap();

    let summary = completed(h.engine.drain().await);
    assert_eq!(summary.skipped, 1);
    assert!(h.gateway.calls().await.is_empty());

    let parked = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(parked.status, ActionStatus::NeedsReselect);
    assert_eq!(parked.retry_count, 0);
    assert!(parked.last_error.is_some());

    // A later sync still leaves it alone.
    let summary = completed(h.engine.drain().await);
    assert_eq!(summary.skipped, 1);
    assert!(h.gateway.calls().await.is_empty());
    assert_eq!(h.store.get(&id).await.unwrap().unwrap().retry_count, 0);
}

#[tokio::test]
async fn reattached_media_syncs_on_the_next_drain() {
    let h = harness().await;
    let dir = tempfile::tempdir().unwrap();
    let game_id = game();
    let missing = MediaRef::new("image/jpeg".into(), 4)
        .with_local_path(dir.path().join("gone.jpg"));
    let id = h
        .queue
        .enqueue_media_submission(game_id, base(), challenge(), Some("proof".into()), missing)
        .await
        .unwrap();

    completed(h.engine.drain().await);
    assert_eq!(h.queue.needs_reselect(game_id).await.unwrap().len(), 1);

    let reselected = dir.path().join("fresh.jpg");
    std::fs::File::create(&reselected)
        .unwrap()
        .write_all(b"data")
        .unwrap();
    h.queue
        .reattach_media(id, MediaRef::new("image/jpeg".into(), 4).with_local_path(reselected))
        .await
        .unwrap();

    let summary = completed(h.engine.drain().await);
    assert_eq!(summary.synced, 1);
    assert_eq!(h.queue.pending_count().await.unwrap(), 0);
    assert_eq!(h.gateway.calls().await.len(), 1);
    assert!(h.gateway.calls().await[0].starts_with("submit_photo:"));
}

#[tokio::test]
async fn offline_round_trip_drains_to_zero_with_one_callback() {
    let h = harness().await;
    let game_id = game();
    let b1 = base();

    // Offline player: check in at B1, then answer challenge C1.
    h.queue.enqueue_check_in(game_id, b1).await.unwrap();
    assert_eq!(h.queue.pending_count().await.unwrap(), 1);
    h.queue
        .enqueue_submission(game_id, b1, challenge(), "the answer".into())
        .await
        .unwrap();
    assert_eq!(h.queue.pending_count().await.unwrap(), 2);

    let callbacks = Arc::new(AtomicUsize::new(0));
    let counter = callbacks.clone();
    h.engine
        .set_on_drain_complete(Arc::new(move |_summary| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        }))
        .await;

    // Network returns.
    let summary = completed(h.engine.drain().await);

    assert_eq!(summary.synced, 2);
    assert_eq!(h.queue.pending_count().await.unwrap(), 0);
    assert_eq!(callbacks.load(Ordering::SeqCst), 1);
    let calls = h.gateway.calls().await;
    assert_eq!(calls.len(), 2);
    assert!(calls[0].starts_with("check_in:"));
    assert!(calls[1].starts_with("submit_answer:"));
}

#[tokio::test]
async fn overlapping_triggers_coalesce_to_a_single_drain() {
    let h = harness_with(
        ScriptedGateway::with_delay(Duration::from_millis(150)),
        test_config(),
    )
    .await;
    h.queue.enqueue_check_in(game(), base()).await.unwrap();

    let engine = h.engine.clone();
    let first = tokio::spawn(async move { engine.drain().await });
    tokio::time::sleep(Duration::from_millis(30)).await;

    let second = h.engine.drain().await;
    assert!(matches!(second, DrainOutcome::AlreadyDraining));

    let first = first.await.unwrap();
    assert_eq!(completed(first).synced, 1);
    assert_eq!(h.gateway.calls().await.len(), 1);
}

#[tokio::test]
async fn enqueue_racing_a_drain_gets_one_follow_up_pass() {
    let h = harness_with(
        ScriptedGateway::with_delay(Duration::from_millis(100)),
        test_config(),
    )
    .await;
    let game_id = game();
    h.queue.enqueue_check_in(game_id, base()).await.unwrap();

    let callbacks = Arc::new(AtomicUsize::new(0));
    let counter = callbacks.clone();
    h.engine
        .set_on_drain_complete(Arc::new(move |_summary| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        }))
        .await;

    let engine = h.engine.clone();
    let drain = tokio::spawn(async move { engine.drain().await });

    // Land a second action while the first is mid-flight.
    tokio::time::sleep(Duration::from_millis(30)).await;
    h.queue.enqueue_check_in(game_id, base()).await.unwrap();

    let summary = completed(drain.await.unwrap());
    assert_eq!(summary.synced, 2);
    assert_eq!(h.queue.pending_count().await.unwrap(), 0);
    // Follow-up happens inside the same drain cycle: one callback only.
    assert_eq!(callbacks.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reconnect_edge_triggers_a_drain() {
    let h = harness().await;
    h.queue.enqueue_check_in(game(), base()).await.unwrap();

    let (tx, rx) = watch::channel(false);
    let _scheduler = SyncScheduler::spawn(h.engine.clone(), &test_config(), rx);

    tx.send(true).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(h.queue.pending_count().await.unwrap(), 0);
    assert_eq!(h.gateway.calls().await.len(), 1);
}

#[tokio::test]
async fn optimistic_progress_updates_at_enqueue_time() {
    let store = Arc::new(SqlitePendingActionStore::in_memory().await.unwrap());
    let progress = Arc::new(MemoryProgressCache::new());
    let queue = ActionQueue::new(store, progress.clone());
    let (game_id, base_id) = (game(), base());

    queue.enqueue_check_in(game_id, base_id).await.unwrap();
    let status = progress.status(&game_id, &base_id).await.unwrap();
    assert_eq!(status.status, BaseStatus::CheckedIn);

    queue
        .enqueue_submission(game_id, base_id, challenge(), "a".into())
        .await
        .unwrap();
    let status = progress.status(&game_id, &base_id).await.unwrap();
    assert_eq!(status.status, BaseStatus::Submitted);
}

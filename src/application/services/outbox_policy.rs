//! Pure decision functions for draining the outbox. Both mobile clients used
//! to duplicate (and drift on) this logic; keeping it stateless and free of
//! I/O makes the shared behavior unit-testable in isolation.

use crate::application::ports::remote_gateway::GatewayError;
use crate::domain::entities::{ActionKind, ActionStatus, PendingAction};
use std::time::Duration;

/// Actions that fail with a retryable error this many times are dropped to
/// keep the queue from deadlocking on a permanently unreachable action.
pub const MAX_RETRIES: u32 = 5;

/// Base delay for exponential backoff between retry attempts.
pub const BASE_BACKOFF: Duration = Duration::from_secs(2);

/// How a gateway failure affects the queued action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transient transport problem; try again with backoff.
    Retry,
    /// The server has rejected this action; drop it rather than retrying
    /// forever against a response that will not change.
    Permanent,
    /// Credentials are stale; pause the whole batch without touching the
    /// action so it survives until the player re-authenticates.
    AuthExpired,
}

fn kind_rank(kind: ActionKind) -> u8 {
    match kind {
        // Check-ins must reach the server before submissions: the server may
        // reject a submission for a base the team never checked in at.
        ActionKind::CheckIn => 0,
        ActionKind::TextSubmission | ActionKind::MediaSubmission => 1,
    }
}

/// Stable order for one drain batch: check-ins first, then FIFO by creation
/// time within the same rank.
pub fn prioritize(mut actions: Vec<PendingAction>) -> Vec<PendingAction> {
    actions.sort_by_key(|a| (kind_rank(a.kind), a.created_at));
    actions
}

/// Whether the engine should dispatch this action at all. Parked media
/// actions wait for the user; actions at the retry cap are dropped by the
/// engine instead of attempted again.
pub fn should_attempt(action: &PendingAction, max_retries: u32) -> bool {
    if action.status == ActionStatus::NeedsReselect {
        return false;
    }
    action.retry_count < max_retries
}

/// Exponential backoff honored before each retry attempt, never before the
/// first attempt: 0, base, 2*base, 4*base, ...
pub fn backoff_delay(retry_count: u32, base: Duration) -> Duration {
    if retry_count == 0 {
        return Duration::ZERO;
    }
    base * 2u32.saturating_pow(retry_count - 1)
}

pub fn classify(error: &GatewayError) -> FailureKind {
    match error {
        GatewayError::Network(_) => FailureKind::Retry,
        GatewayError::ServerRejected { .. } => FailureKind::Permanent,
        GatewayError::AuthExpired => FailureKind::AuthExpired,
    }
}

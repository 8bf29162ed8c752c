use crate::domain::value_objects::{AccessToken, ActionId, BaseId, ChallengeId, GameId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure modes of the remote gateway that the sync engine distinguishes.
/// The transport itself (HTTP client, timeouts, upload chunking) lives behind
/// the trait in the platform adapter.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Transport-level failure: timeout, DNS, connection reset. Retryable.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status. Retrying will not help.
    #[error("Server rejected request ({status}): {body}")]
    ServerRejected { status: u16, body: String },

    /// 401/403: the bearer token is no longer accepted. The batch pauses and
    /// the caller re-authenticates before the next drain.
    #[error("Authentication expired")]
    AuthExpired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInConfirmation {
    pub check_in_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfirmation {
    pub submission_id: String,
}

/// The three remote verbs the sync engine drains the queue through.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn check_in(
        &self,
        game_id: &GameId,
        base_id: &BaseId,
        token: &AccessToken,
    ) -> Result<CheckInConfirmation, GatewayError>;

    #[allow(clippy::too_many_arguments)]
    async fn submit_answer(
        &self,
        game_id: &GameId,
        base_id: &BaseId,
        challenge_id: &ChallengeId,
        answer: &str,
        idempotency_key: &ActionId,
        token: &AccessToken,
    ) -> Result<SubmissionConfirmation, GatewayError>;

    #[allow(clippy::too_many_arguments)]
    async fn submit_photo(
        &self,
        game_id: &GameId,
        base_id: &BaseId,
        challenge_id: &ChallengeId,
        bytes: Vec<u8>,
        notes: Option<&str>,
        idempotency_key: &ActionId,
        token: &AccessToken,
    ) -> Result<SubmissionConfirmation, GatewayError>;
}

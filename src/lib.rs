pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::ports::{
    AuthProvider, CheckInConfirmation, GatewayError, MediaSource, PendingActionStore,
    ProgressCache, RemoteGateway, SubmissionConfirmation,
};
pub use application::services::{
    ActionQueue, DrainOutcome, DrainSummary, DroppedAction, SyncEngine, SyncScheduler,
};
pub use domain::entities::{
    ActionKind, ActionStatus, BaseProgress, BaseStatus, PendingAction, SubmissionReview,
};
pub use domain::value_objects::{AccessToken, ActionId, BaseId, ChallengeId, GameId, MediaRef};
pub use shared::config::{AppConfig, DatabaseConfig, SyncConfig};
pub use shared::error::AppError;
pub use state::AppState;

/// Install a tracing subscriber for the host process. The platform shells
/// call this once at startup; tests and embedders that already have a
/// subscriber can skip it.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pointfinder_sync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

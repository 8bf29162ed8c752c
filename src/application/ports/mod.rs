pub mod action_store;
pub mod auth;
pub mod media_source;
pub mod progress_cache;
pub mod remote_gateway;

pub use action_store::PendingActionStore;
pub use auth::AuthProvider;
pub use media_source::MediaSource;
pub use progress_cache::ProgressCache;
pub use remote_gateway::{
    CheckInConfirmation, GatewayError, RemoteGateway, SubmissionConfirmation,
};

use crate::domain::value_objects::MediaRef;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Resolves the bytes behind a media reference at sync time. Returns
/// `AppError::MediaUnavailable` when neither the local copy nor the original
/// source still exists; the engine then parks the action instead of
/// attempting the network.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn load(&self, media: &MediaRef) -> Result<Vec<u8>, AppError>;

    /// Best-effort removal of the app-private copy once the action is done.
    async fn discard_local_copy(&self, media: &MediaRef);
}

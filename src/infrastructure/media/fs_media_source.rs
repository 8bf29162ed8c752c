use crate::application::ports::MediaSource;
use crate::domain::value_objects::MediaRef;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Resolves media bytes from the filesystem: the app-private copy first,
/// then the path the user originally picked from. Either can disappear
/// between enqueue and sync (storage pressure, photo library churn).
#[derive(Default)]
pub struct FsMediaSource;

impl FsMediaSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaSource for FsMediaSource {
    async fn load(&self, media: &MediaRef) -> Result<Vec<u8>, AppError> {
        for path in [&media.local_path, &media.source_path].into_iter().flatten() {
            match tokio::fs::read(path).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "media path unreadable");
                }
            }
        }
        Err(AppError::MediaUnavailable(
            "no readable media path remains for this submission".to_string(),
        ))
    }

    async fn discard_local_copy(&self, media: &MediaRef) {
        if let Some(path) = &media.local_path {
            if let Err(e) = tokio::fs::remove_file(path).await {
                tracing::debug!(path = %path.display(), error = %e, "could not delete local media copy");
            }
        }
    }
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reference to locally-held media bytes attached to a submission. The queue
/// stores the reference, never the bytes, so a process restart can invalidate
/// it; resolution happens through the `MediaSource` port at sync time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// App-private copy made at selection time, deleted once the action is
    /// removed from the queue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    /// Path the user originally picked the file from. May disappear at any
    /// time (external storage, photo library churn).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
}

impl MediaRef {
    pub fn new(content_type: String, size_bytes: i64) -> Self {
        Self {
            content_type,
            size_bytes,
            file_name: None,
            local_path: None,
            source_path: None,
        }
    }

    pub fn with_file_name(mut self, file_name: String) -> Self {
        self.file_name = Some(file_name);
        self
    }

    pub fn with_local_path(mut self, path: PathBuf) -> Self {
        self.local_path = Some(path);
        self
    }

    pub fn with_source_path(mut self, path: PathBuf) -> Self {
        self.source_path = Some(path);
        self
    }
}

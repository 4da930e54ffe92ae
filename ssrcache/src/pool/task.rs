//! Units of work handed to the render worker.

use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::artifact::{ArtifactDescriptor, ArtifactTier, CacheKey};

/// New render output to publish for a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishParams {
    pub url: String,
    pub html: String,
    /// Publish to the Raw tier only and skip optimization.
    pub raw_only: bool,
}

impl PublishParams {
    /// Creates params for a full publish (Raw, then optimized Fresh).
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            raw_only: false,
        }
    }

    /// Stops after the Raw tier is written.
    pub fn raw_only(mut self) -> Self {
        self.raw_only = true;
        self
    }
}

/// The operation a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOperation {
    FetchFull,
    Publish,
    Revalidate,
    Evict,
    DeleteResource,
}

impl fmt::Display for TaskOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FetchFull => "fetch_full",
            Self::Publish => "publish",
            Self::Revalidate => "revalidate",
            Self::Evict => "evict",
            Self::DeleteResource => "delete_resource",
        };
        f.write_str(name)
    }
}

/// Operation-specific arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPayload {
    FetchFull { url: String },
    Publish(PublishParams),
    Revalidate { url: String },
    Evict { url: String },
    DeleteResource { path: PathBuf },
}

/// A single dispatch. Created at call time, consumed by exactly one worker,
/// never persisted or retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerTask {
    pub payload: TaskPayload,
    pub issued_at: SystemTime,
}

impl WorkerTask {
    fn issue(payload: TaskPayload) -> Self {
        Self {
            payload,
            issued_at: SystemTime::now(),
        }
    }

    pub fn fetch_full(url: impl Into<String>) -> Self {
        Self::issue(TaskPayload::FetchFull { url: url.into() })
    }

    pub fn publish(params: PublishParams) -> Self {
        Self::issue(TaskPayload::Publish(params))
    }

    pub fn revalidate(url: impl Into<String>) -> Self {
        Self::issue(TaskPayload::Revalidate { url: url.into() })
    }

    pub fn evict(url: impl Into<String>) -> Self {
        Self::issue(TaskPayload::Evict { url: url.into() })
    }

    pub fn delete_resource(path: impl Into<PathBuf>) -> Self {
        Self::issue(TaskPayload::DeleteResource { path: path.into() })
    }

    /// The operation this task performs.
    pub fn operation(&self) -> TaskOperation {
        match &self.payload {
            TaskPayload::FetchFull { .. } => TaskOperation::FetchFull,
            TaskPayload::Publish(_) => TaskOperation::Publish,
            TaskPayload::Revalidate { .. } => TaskOperation::Revalidate,
            TaskPayload::Evict { .. } => TaskOperation::Evict,
            TaskPayload::DeleteResource { .. } => TaskOperation::DeleteResource,
        }
    }
}

/// Acknowledgment of a tier write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteAck {
    pub key: CacheKey,
    pub tier: ArtifactTier,
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// What a worker returns for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutput {
    /// Result of a full fetch; `None` when nothing could be served or rendered.
    Artifact(Option<ArtifactDescriptor>),
    /// A publish or revalidate finished writing.
    Written(WriteAck),
    /// Number of tier files removed for a key.
    Evicted { removed: usize },
    /// Whether a resource was deleted.
    Deleted(bool),
}

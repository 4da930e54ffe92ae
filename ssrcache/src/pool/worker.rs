//! The contract between the pool and whatever executes tasks.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use super::task::{TaskOperation, TaskOutput, WorkerTask};
use crate::error::SsrCacheError;
use crate::transform::TransformError;

/// Boxed, sendable future returned by [`RenderWorker::execute`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Executes pooled tasks.
///
/// The pool only calls `execute`; it never inspects the worker's state, so a
/// worker is free to hold browsers, file handles, or child processes.
pub trait RenderWorker: Send + Sync + 'static {
    /// Runs one task to completion.
    fn execute(&self, task: WorkerTask) -> BoxFuture<'_, Result<TaskOutput, WorkerError>>;
}

/// Faults raised by a worker while executing a task.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The renderer failed to produce HTML.
    #[error("Render failed for {url}: {reason}")]
    Render { url: String, reason: String },

    /// The worker does not implement this operation.
    #[error("Operation not supported by this worker: {0}")]
    Unsupported(TaskOperation),

    /// HTML transform failed.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Filesystem or validation fault.
    #[error(transparent)]
    Cache(#[from] SsrCacheError),
}

impl WorkerError {
    pub fn render(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Render {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

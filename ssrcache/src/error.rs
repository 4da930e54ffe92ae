//! Crate-level error taxonomy.
//!
//! Every fault the cache layer can hit falls into one of four kinds. None of
//! them cross the [`CacheGateway`](crate::gateway::CacheGateway) or reaper
//! boundary: they are logged where they occur and turned into a soft
//! "unavailable" result (`None`, `false`, or a miss).

use std::path::PathBuf;
use thiserror::Error;

/// Faults raised inside the cache layer.
#[derive(Debug, Error)]
pub enum SsrCacheError {
    /// A required input was missing or empty (no URL, no file path).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A stat, read, write, or unlink failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A dispatched task failed, panicked, or could not be scheduled.
    #[error("Worker fault: {0}")]
    WorkerFault(String),

    /// An artifact exists on disk but holds zero bytes.
    #[error("Corrupt artifact (zero bytes): {}", .0.display())]
    CorruptArtifact(PathBuf),
}

impl SsrCacheError {
    /// Wraps an I/O error together with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for "file not found" I/O faults.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

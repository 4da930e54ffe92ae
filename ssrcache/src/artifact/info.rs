//! Filesystem metadata for artifact files.

use std::path::Path;
use std::time::SystemTime;

use crate::error::SsrCacheError;

/// Size and timestamps of a file, as the cache layer sees them.
///
/// `requested_at` is the access time: the store records reads by touching
/// it, and the reaper measures idleness from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u64,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub requested_at: SystemTime,
}

impl FileInfo {
    /// Stats `path` synchronously.
    pub fn read(path: &Path) -> Result<Self, SsrCacheError> {
        let metadata = std::fs::metadata(path).map_err(|e| SsrCacheError::io(path, e))?;
        Ok(Self::from_metadata(&metadata))
    }

    /// Stats `path` without blocking the runtime.
    pub async fn read_async(path: &Path) -> Result<Self, SsrCacheError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| SsrCacheError::io(path, e))?;
        Ok(Self::from_metadata(&metadata))
    }

    /// Builds the info from already-fetched metadata.
    ///
    /// Platforms without birth or access times fall back to the
    /// modification time.
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        let updated_at = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Self {
            size: metadata.len(),
            created_at: metadata.created().unwrap_or(updated_at),
            updated_at,
            requested_at: metadata.accessed().unwrap_or(updated_at),
        }
    }

    /// Most recent of the request and update times.
    pub fn last_activity(&self) -> SystemTime {
        self.requested_at.max(self.updated_at)
    }
}

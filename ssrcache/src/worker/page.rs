//! Default render worker: renders pages and writes tier files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use super::renderer::Renderer;
use crate::artifact::{ArtifactDescriptor, ArtifactStore, ArtifactTier, CacheKey};
use crate::error::SsrCacheError;
use crate::pool::{
    BoxFuture, PublishParams, RenderWorker, TaskOutput, TaskPayload, WorkerError, WorkerTask,
    WriteAck,
};
use crate::transform::{codec, HtmlTransformer};

/// Distinguishes temp files of concurrent writers in one process.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Executes pool tasks against an [`ArtifactStore`].
///
/// This is the sole writer of tier content. Every write lands in a temp file
/// that is renamed over the tier path, so a reader sees either the previous
/// file or the complete new one.
pub struct PageWorker<R> {
    store: ArtifactStore,
    renderer: R,
    transformer: HtmlTransformer,
}

impl<R: Renderer> PageWorker<R> {
    pub fn new(store: ArtifactStore, renderer: R, transformer: HtmlTransformer) -> Self {
        Self {
            store,
            renderer,
            transformer,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Writes Raw, then the transformed Fresh tier, then clears Raw and
    /// Renewing.
    ///
    /// If the transform fails the Raw tier stays in place and remains
    /// servable.
    pub async fn publish(&self, params: PublishParams) -> Result<WriteAck, WorkerError> {
        let key = validated_key(&params.url)?;
        if params.html.trim().is_empty() {
            return Err(SsrCacheError::Validation(format!("empty html for {}", params.url)).into());
        }

        tokio::fs::create_dir_all(self.store.dir())
            .await
            .map_err(|e| SsrCacheError::io(self.store.dir(), e))?;

        let raw = self
            .write_tier(&key, ArtifactTier::Raw, &params.html)
            .await?;
        if params.raw_only {
            return Ok(raw);
        }

        let transformer = self.transformer;
        let html = params.html;
        let url = params.url.clone();
        let transformed = tokio::task::spawn_blocking(move || {
            let optimized = transformer.optimize(html, true, false)?;
            transformer.compress(optimized, false)
        })
        .await
        .map_err(|e| WorkerError::render(&url, format!("transform task failed: {e}")))??;

        let fresh = self
            .write_tier(&key, ArtifactTier::Fresh, &transformed)
            .await?;

        for tier in [ArtifactTier::Raw, ArtifactTier::Renewing] {
            remove_if_exists(&self.store.tier_path(&key, tier)).await?;
        }

        info!(url = %params.url, %key, bytes = fresh.bytes_written, "Published");
        Ok(fresh)
    }

    /// Serves from disk, rendering and publishing on a miss.
    pub async fn fetch_full(&self, url: &str) -> Result<Option<ArtifactDescriptor>, WorkerError> {
        let key = validated_key(url)?;
        if let Some(descriptor) = self.store.resolve(&key) {
            return Ok(Some(descriptor));
        }

        debug!(url, %key, "Miss, rendering");
        let html = self.renderer.render(url).await?;
        self.publish(PublishParams::new(url, html)).await?;
        Ok(self.store.resolve(&key))
    }

    /// Re-renders `url` while the previous Fresh copy is served as Renewing.
    pub async fn revalidate(&self, url: &str) -> Result<WriteAck, WorkerError> {
        let key = validated_key(url)?;
        let fresh = self.store.tier_path(&key, ArtifactTier::Fresh);
        let renewing = self.store.tier_path(&key, ArtifactTier::Renewing);

        let moved = match tokio::fs::rename(&fresh, &renewing).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(SsrCacheError::io(&fresh, e).into()),
        };

        match self.renderer.render(url).await {
            Ok(html) => self.publish(PublishParams::new(url, html)).await,
            Err(e) => {
                if moved {
                    if let Err(restore) = tokio::fs::rename(&renewing, &fresh).await {
                        warn!(url, error = %restore, "Failed to restore fresh tier");
                    }
                }
                Err(e)
            }
        }
    }

    /// Removes every tier file for `url`. Returns how many were removed.
    pub async fn evict(&self, url: &str) -> Result<usize, WorkerError> {
        let key = validated_key(url)?;
        let mut removed = 0;
        for (tier, path) in self.store.existing_tiers(&key) {
            if remove_if_exists(&path).await? {
                debug!(%key, %tier, "Evicted tier");
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn write_tier(
        &self,
        key: &CacheKey,
        tier: ArtifactTier,
        html: &str,
    ) -> Result<WriteAck, WorkerError> {
        let path = self.store.tier_path(key, tier);
        let bytes = codec::encode(html);
        write_atomic(&path, &bytes).await?;
        Ok(WriteAck {
            key: key.clone(),
            tier,
            path,
            bytes_written: bytes.len() as u64,
        })
    }
}

impl<R: Renderer> RenderWorker for PageWorker<R> {
    fn execute(&self, task: WorkerTask) -> BoxFuture<'_, Result<TaskOutput, WorkerError>> {
        Box::pin(async move {
            match task.payload {
                TaskPayload::FetchFull { url } => self.fetch_full(&url).await.map(TaskOutput::Artifact),
                TaskPayload::Publish(params) => self.publish(params).await.map(TaskOutput::Written),
                TaskPayload::Revalidate { url } => {
                    self.revalidate(&url).await.map(TaskOutput::Written)
                }
                TaskPayload::Evict { url } => self
                    .evict(&url)
                    .await
                    .map(|removed| TaskOutput::Evicted { removed }),
                TaskPayload::DeleteResource { path } => {
                    delete_resource(&path).await.map(TaskOutput::Deleted)
                }
            }
        })
    }
}

fn validated_key(url: &str) -> Result<CacheKey, SsrCacheError> {
    if url.trim().is_empty() {
        return Err(SsrCacheError::Validation("url is required".to_string()));
    }
    Ok(CacheKey::from_url(url))
}

/// Removes a file or a whole directory tree. `Ok(false)` when nothing exists.
pub async fn delete_resource(path: &Path) -> Result<bool, WorkerError> {
    if path.as_os_str().is_empty() {
        return Err(SsrCacheError::Validation("path is required".to_string()).into());
    }

    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(SsrCacheError::io(path, e).into()),
    };

    let result = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(SsrCacheError::io(path, e).into()),
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SsrCacheError> {
    let temp = temp_path(path);
    tokio::fs::write(&temp, bytes)
        .await
        .map_err(|e| SsrCacheError::io(&temp, e))?;
    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(SsrCacheError::io(path, e));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
}

async fn remove_if_exists(path: &Path) -> Result<bool, SsrCacheError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(SsrCacheError::io(path, e)),
    }
}

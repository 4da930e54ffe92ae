//! Public cache operations.
//!
//! [`CacheGateway`] is the boundary callers see. Reads on the hot path
//! ([`CacheGateway::achieve`]) stay on disk; everything heavy goes through
//! the shared [`TaskPool`]. Nothing here returns an error: faults are logged
//! and become `None`.

mod maintenance;

pub use crate::artifact::STATUS_OK;
pub use maintenance::{MaintenanceDocument, MaintenanceMode, STATUS_UNAVAILABLE};

use tracing::{debug, error, warn};

use crate::artifact::{ArtifactDescriptor, ArtifactStore, CacheKey};
use crate::error::SsrCacheError;
use crate::pool::{PublishParams, TaskOutput, TaskPool, WorkerTask, WriteAck};

/// Result of [`CacheGateway::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResponse {
    Artifact(ArtifactDescriptor),
    Maintenance(MaintenanceDocument),
}

/// Result of [`CacheGateway::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishResponse {
    Written(WriteAck),
    Maintenance(MaintenanceDocument),
}

/// Cache operations over one artifact directory.
#[derive(Debug, Clone)]
pub struct CacheGateway {
    store: ArtifactStore,
    pool: TaskPool,
    maintenance: MaintenanceMode,
}

impl CacheGateway {
    pub fn new(store: ArtifactStore, pool: TaskPool) -> Self {
        Self {
            store,
            pool,
            maintenance: MaintenanceMode::disabled(),
        }
    }

    pub fn with_maintenance(mut self, maintenance: MaintenanceMode) -> Self {
        self.maintenance = maintenance;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn pool(&self) -> &TaskPool {
        &self.pool
    }

    pub fn is_maintenance(&self) -> bool {
        self.maintenance.enabled
    }

    /// Full fetch-or-render through the worker.
    pub async fn fetch(&self, url: &str) -> Option<FetchResponse> {
        if self.maintenance.enabled {
            return Some(FetchResponse::Maintenance(MaintenanceDocument::new(
                &self.maintenance.page,
                None,
            )));
        }

        match self.pool.run(WorkerTask::fetch_full(url)).await? {
            TaskOutput::Artifact(descriptor) => descriptor.map(FetchResponse::Artifact),
            other => {
                warn!(url, ?other, "Unexpected output for fetch");
                None
            }
        }
    }

    /// Disk-only lookup. Never dispatches work.
    ///
    /// The returned descriptor carries a fresh `requested_at`; pass it to
    /// [`CacheGateway::record_request`] to persist it.
    pub fn achieve(&self, url: &str) -> Option<ArtifactDescriptor> {
        if self.maintenance.enabled {
            return None;
        }
        if url.trim().is_empty() {
            error!(error = %SsrCacheError::Validation("url is required".into()), "achieve rejected");
            return None;
        }

        let key = CacheKey::from_url(url);
        let descriptor = self.store.resolve(&key);
        debug!(url, %key, hit = descriptor.is_some(), "achieve");
        descriptor
    }

    /// Persists a descriptor's request time for the reaper's idle check.
    pub fn record_request(&self, descriptor: &ArtifactDescriptor) -> bool {
        match self.store.record_request(descriptor) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to record request time");
                false
            }
        }
    }

    /// Writes new render output through the worker.
    pub async fn publish(&self, params: PublishParams) -> Option<PublishResponse> {
        if self.maintenance.enabled {
            return Some(PublishResponse::Maintenance(MaintenanceDocument::new(
                &self.maintenance.page,
                Some(params.html),
            )));
        }

        let url = params.url.clone();
        match self.pool.run(WorkerTask::publish(params)).await? {
            TaskOutput::Written(ack) => Some(PublishResponse::Written(ack)),
            other => {
                warn!(url, ?other, "Unexpected output for publish");
                None
            }
        }
    }

    /// Re-renders `url`. Dispatches even under maintenance; callers that
    /// need suppression must check [`CacheGateway::is_maintenance`].
    pub async fn revalidate(&self, url: &str) -> Option<WriteAck> {
        match self.pool.run(WorkerTask::revalidate(url)).await? {
            TaskOutput::Written(ack) => Some(ack),
            other => {
                warn!(url, ?other, "Unexpected output for revalidate");
                None
            }
        }
    }

    /// Removes every tier for `url`. No-op under maintenance.
    ///
    /// Returns the number of tier files removed, `None` under maintenance or
    /// on a worker fault.
    pub async fn evict(&self, url: &str) -> Option<usize> {
        if self.maintenance.enabled {
            return None;
        }

        match self.pool.run(WorkerTask::evict(url)).await? {
            TaskOutput::Evicted { removed } => Some(removed),
            other => {
                warn!(url, ?other, "Unexpected output for evict");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactTier;
    use crate::pool::{BoxFuture, PoolConfig, RenderWorker, TaskOperation, TaskPayload, WorkerError};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Records every operation and answers with a canned output.
    #[derive(Default)]
    struct RecordingWorker {
        seen: Arc<Mutex<Vec<TaskOperation>>>,
    }

    impl RenderWorker for RecordingWorker {
        fn execute(&self, task: WorkerTask) -> BoxFuture<'_, Result<TaskOutput, WorkerError>> {
            self.seen.lock().unwrap().push(task.operation());
            Box::pin(async move {
                match task.payload {
                    TaskPayload::FetchFull { url } if url.contains("fail") => {
                        Err(WorkerError::render(url, "boom"))
                    }
                    TaskPayload::FetchFull { .. } => Ok(TaskOutput::Artifact(None)),
                    TaskPayload::Publish(params) => Ok(TaskOutput::Written(WriteAck {
                        key: CacheKey::from_url(&params.url),
                        tier: ArtifactTier::Fresh,
                        path: "p.br".into(),
                        bytes_written: params.html.len() as u64,
                    })),
                    TaskPayload::Revalidate { .. } => Ok(TaskOutput::Deleted(true)),
                    TaskPayload::Evict { .. } => Ok(TaskOutput::Evicted { removed: 3 }),
                    TaskPayload::DeleteResource { .. } => Ok(TaskOutput::Deleted(false)),
                }
            })
        }
    }

    fn gateway(dir: &TempDir) -> (CacheGateway, Arc<Mutex<Vec<TaskOperation>>>) {
        let worker = RecordingWorker::default();
        let seen = worker.seen.clone();
        let pool = TaskPool::new(worker, PoolConfig::new(2));
        (
            CacheGateway::new(ArtifactStore::new(dir.path().join("pages")), pool),
            seen,
        )
    }

    fn maintained(dir: &TempDir) -> (CacheGateway, Arc<Mutex<Vec<TaskOperation>>>) {
        let (gw, seen) = gateway(dir);
        (
            gw.with_maintenance(MaintenanceMode::enabled(dir.path().join("maintain.html"))),
            seen,
        )
    }

    #[test]
    fn test_achieve_rejects_empty_url() {
        let temp = TempDir::new().unwrap();
        let (gw, _) = gateway(&temp);
        assert!(gw.achieve("").is_none());
        assert!(gw.achieve("   ").is_none());
    }

    #[test]
    fn test_achieve_reads_disk_without_dispatch() {
        let temp = TempDir::new().unwrap();
        let (gw, seen) = gateway(&temp);
        std::fs::create_dir_all(gw.store().dir()).unwrap();
        let key = CacheKey::from_url("https://a.test/");
        std::fs::write(gw.store().tier_path(&key, ArtifactTier::Raw), [1u8; 10]).unwrap();

        let desc = gw.achieve("https://a.test/").unwrap();
        assert!(desc.is_raw());
        assert!(desc.available);
        assert!(seen.lock().unwrap().is_empty());
        assert!(gw.record_request(&desc));
    }

    #[test]
    fn test_achieve_none_under_maintenance() {
        let temp = TempDir::new().unwrap();
        let (gw, _) = maintained(&temp);
        assert!(gw.achieve("https://a.test/").is_none());
    }

    #[tokio::test]
    async fn test_fetch_under_maintenance_is_503_without_dispatch() {
        let temp = TempDir::new().unwrap();
        let (gw, seen) = maintained(&temp);

        match gw.fetch("https://a.test/").await {
            Some(FetchResponse::Maintenance(doc)) => assert_eq!(doc.status, STATUS_UNAVAILABLE),
            other => panic!("expected maintenance document, got {other:?}"),
        }
        assert!(seen.lock().unwrap().is_empty());
        assert!(!gw.store().dir().exists());
    }

    #[tokio::test]
    async fn test_publish_under_maintenance_echoes_content() {
        let temp = TempDir::new().unwrap();
        let (gw, seen) = maintained(&temp);

        let with_html = gw.publish(PublishParams::new("u", "<p>x</p>")).await;
        let without_html = gw.publish(PublishParams::new("u", "")).await;

        match (with_html, without_html) {
            (
                Some(PublishResponse::Maintenance(a)),
                Some(PublishResponse::Maintenance(b)),
            ) => {
                assert_eq!(a.status, STATUS_OK);
                assert_eq!(b.status, STATUS_UNAVAILABLE);
            }
            other => panic!("expected maintenance documents, got {other:?}"),
        }
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_evict_noop_under_maintenance_but_revalidate_dispatches() {
        let temp = TempDir::new().unwrap();
        let (gw, seen) = maintained(&temp);

        assert!(gw.evict("u").await.is_none());
        let _ = gw.revalidate("u").await;

        assert_eq!(*seen.lock().unwrap(), vec![TaskOperation::Revalidate]);
    }

    #[tokio::test]
    async fn test_fetch_worker_fault_is_none() {
        let temp = TempDir::new().unwrap();
        let (gw, _) = gateway(&temp);
        assert!(gw.fetch("https://fail.test/").await.is_none());
        assert!(gw.fetch("https://ok.test/").await.is_none());
        assert_eq!(gw.pool().stats().faulted, 1);
    }

    #[tokio::test]
    async fn test_publish_and_evict_dispatch() {
        let temp = TempDir::new().unwrap();
        let (gw, seen) = gateway(&temp);

        match gw.publish(PublishParams::new("u", "<p>x</p>")).await {
            Some(PublishResponse::Written(ack)) => assert_eq!(ack.bytes_written, 8),
            other => panic!("expected write ack, got {other:?}"),
        }
        assert_eq!(gw.evict("u").await, Some(3));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![TaskOperation::Publish, TaskOperation::Evict]
        );
    }

    #[tokio::test]
    async fn test_unexpected_output_is_none() {
        let temp = TempDir::new().unwrap();
        let (gw, _) = gateway(&temp);
        assert!(gw.revalidate("u").await.is_none());
    }
}

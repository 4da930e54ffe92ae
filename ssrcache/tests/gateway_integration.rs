//! Integration tests for the cache gateway over a real page worker.
//!
//! These tests verify:
//! - Tier selection on the read path (Fresh, Renewing, Raw, corrupt files)
//! - Render-on-miss, publish, revalidate and evict through the shared pool
//! - Maintenance mode short-circuits
//! - Fault isolation and the worker bound of the pool

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ssrcache::artifact::{ArtifactStore, ArtifactTier, CacheKey};
use ssrcache::gateway::{
    CacheGateway, FetchResponse, MaintenanceMode, PublishResponse, STATUS_OK, STATUS_UNAVAILABLE,
};
use ssrcache::pool::{BoxFuture, PoolConfig, PublishParams, TaskPool, WorkerError};
use ssrcache::transform::{codec, HtmlTransformer};
use ssrcache::worker::{PageWorker, Renderer};
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// Renders a small page per URL after an optional delay.
///
/// URLs containing "panic" panic inside the worker; URLs containing "broken"
/// fail with a render error.
#[derive(Clone, Default)]
struct FakeRenderer {
    renders: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    delay_ms: u64,
    version: Arc<AtomicUsize>,
}

impl Renderer for FakeRenderer {
    fn render<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, WorkerError>> {
        Box::pin(async move {
            if url.contains("panic") {
                panic!("renderer crashed on {url}");
            }
            if url.contains("broken") {
                return Err(WorkerError::render(url, "fake failure"));
            }

            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);

            self.renders.fetch_add(1, Ordering::SeqCst);
            let version = self.version.load(Ordering::SeqCst);
            Ok(format!(
                "<html><body>\n  <h1>{url}</h1>\n  <p>v{version}</p>\n</body></html>"
            ))
        })
    }
}

struct Fixture {
    _temp: TempDir,
    store: ArtifactStore,
    renderer: FakeRenderer,
    gateway: CacheGateway,
}

fn fixture_with(renderer: FakeRenderer, workers: usize) -> Fixture {
    let temp = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp.path().join("pages"));
    let worker = PageWorker::new(store.clone(), renderer.clone(), HtmlTransformer::default());
    let pool = TaskPool::new(worker, PoolConfig::new(workers));
    Fixture {
        _temp: temp,
        gateway: CacheGateway::new(store.clone(), pool),
        store,
        renderer,
    }
}

fn fixture() -> Fixture {
    fixture_with(FakeRenderer::default(), 2)
}

fn write_tier(store: &ArtifactStore, url: &str, tier: ArtifactTier, bytes: &[u8]) {
    std::fs::create_dir_all(store.dir()).unwrap();
    std::fs::write(store.tier_path(&CacheKey::from_url(url), tier), bytes).unwrap();
}

fn read_tier(store: &ArtifactStore, url: &str, tier: ArtifactTier) -> Option<String> {
    let bytes = std::fs::read(store.tier_path(&CacheKey::from_url(url), tier)).ok()?;
    Some(codec::decode(&bytes).unwrap())
}

// =============================================================================
// Read path
// =============================================================================

#[test]
fn test_raw_only_artifact_is_served_as_raw() {
    let f = fixture();
    write_tier(&f.store, "u1", ArtifactTier::Raw, b"0123456789");

    let descriptor = f.gateway.achieve("u1").unwrap();
    assert!(descriptor.is_raw());
    assert!(descriptor.available);
    assert_eq!(descriptor.size_bytes, 10);
    assert_eq!(descriptor.status, STATUS_OK);
}

#[test]
fn test_empty_fresh_falls_back_to_renewing() {
    let f = fixture();
    write_tier(&f.store, "u1", ArtifactTier::Fresh, b"");
    write_tier(&f.store, "u1", ArtifactTier::Renewing, b"stale copy");

    let descriptor = f.gateway.achieve("u1").unwrap();
    assert_eq!(descriptor.tier, ArtifactTier::Renewing);
    assert!(!descriptor.is_raw());
}

#[test]
fn test_tier_precedence() {
    let f = fixture();
    write_tier(&f.store, "u1", ArtifactTier::Raw, b"raw");
    write_tier(&f.store, "u1", ArtifactTier::Renewing, b"renewing");
    assert_eq!(f.gateway.achieve("u1").unwrap().tier, ArtifactTier::Renewing);

    write_tier(&f.store, "u1", ArtifactTier::Fresh, b"fresh");
    assert_eq!(f.gateway.achieve("u1").unwrap().tier, ArtifactTier::Fresh);
}

#[test]
fn test_only_empty_files_is_miss() {
    let f = fixture();
    write_tier(&f.store, "u1", ArtifactTier::Fresh, b"");
    write_tier(&f.store, "u1", ArtifactTier::Raw, b"");
    assert!(f.gateway.achieve("u1").is_none());
    assert!(f.gateway.achieve("").is_none());
}

// =============================================================================
// Write path
// =============================================================================

#[tokio::test]
async fn test_fetch_renders_once_then_serves_from_disk() {
    let f = fixture();

    let first = match f.gateway.fetch("https://site.test/a").await {
        Some(FetchResponse::Artifact(descriptor)) => descriptor,
        other => panic!("expected artifact, got {other:?}"),
    };
    assert_eq!(first.tier, ArtifactTier::Fresh);
    assert!(f.gateway.record_request(&first));

    let second = f.gateway.achieve("https://site.test/a").unwrap();
    assert_eq!(second.path, first.path);
    assert!(f.gateway.fetch("https://site.test/a").await.is_some());
    assert_eq!(f.renderer.renders.load(Ordering::SeqCst), 1);

    let html = read_tier(&f.store, "https://site.test/a", ArtifactTier::Fresh).unwrap();
    assert!(html.starts_with("<html lang=en>"));
    assert!(!html.contains("\n  "));
}

#[tokio::test]
async fn test_publish_then_revalidate_then_evict() {
    let f = fixture();
    let url = "https://site.test/b";

    let ack = match f
        .gateway
        .publish(PublishParams::new(url, "<html><p>published</p></html>"))
        .await
    {
        Some(PublishResponse::Written(ack)) => ack,
        other => panic!("expected write, got {other:?}"),
    };
    assert_eq!(ack.tier, ArtifactTier::Fresh);
    assert!(read_tier(&f.store, url, ArtifactTier::Raw).is_none());

    f.renderer.version.store(2, Ordering::SeqCst);
    let ack = f.gateway.revalidate(url).await.unwrap();
    assert_eq!(ack.tier, ArtifactTier::Fresh);
    assert!(read_tier(&f.store, url, ArtifactTier::Fresh)
        .unwrap()
        .contains("v2"));
    assert!(read_tier(&f.store, url, ArtifactTier::Renewing).is_none());

    assert_eq!(f.gateway.evict(url).await, Some(1));
    assert!(f.gateway.achieve(url).is_none());
    assert_eq!(f.gateway.evict(url).await, Some(0));
}

#[tokio::test]
async fn test_raw_only_publish_is_servable_immediately() {
    let f = fixture();
    let url = "https://site.test/raw";
    f.gateway
        .publish(PublishParams::new(url, "<p>unoptimized</p>").raw_only())
        .await
        .unwrap();

    let descriptor = f.gateway.achieve(url).unwrap();
    assert!(descriptor.is_raw());
    assert_eq!(
        read_tier(&f.store, url, ArtifactTier::Raw).unwrap(),
        "<p>unoptimized</p>"
    );
}

#[tokio::test]
async fn test_failed_revalidation_keeps_serving_previous_copy() {
    let f = fixture();
    let url = "https://broken.test/";
    f.gateway
        .publish(PublishParams::new(url, "<p>old</p>"))
        .await
        .unwrap();

    assert!(f.gateway.revalidate(url).await.is_none());

    let descriptor = f.gateway.achieve(url).unwrap();
    assert_eq!(descriptor.tier, ArtifactTier::Fresh);
    assert!(read_tier(&f.store, url, ArtifactTier::Fresh)
        .unwrap()
        .contains("old"));
}

#[tokio::test]
async fn test_publish_deeply_nested_markup() {
    let f = fixture();
    let url = "https://site.test/deep";
    let depth = 100_000;
    let html = format!("<html><body>{}x</body></html>", "<div>".repeat(depth));

    let ack = match f.gateway.publish(PublishParams::new(url, html)).await {
        Some(PublishResponse::Written(ack)) => ack,
        other => panic!("expected write, got {other:?}"),
    };
    assert_eq!(ack.tier, ArtifactTier::Fresh);

    let fresh = read_tier(&f.store, url, ArtifactTier::Fresh).unwrap();
    assert_eq!(fresh.matches("<div>").count(), depth);
    assert!(fresh.contains("x</div>"));
    assert!(f.gateway.fetch(url).await.is_some());
}

// =============================================================================
// Maintenance
// =============================================================================

#[tokio::test]
async fn test_maintenance_never_touches_disk() {
    let f = fixture();
    let gateway = f
        .gateway
        .clone()
        .with_maintenance(MaintenanceMode::enabled("/srv/maintenance.html"));

    match gateway.fetch("https://site.test/").await {
        Some(FetchResponse::Maintenance(doc)) => {
            assert_eq!(doc.status, STATUS_UNAVAILABLE);
            assert!(doc.html.is_none());
        }
        other => panic!("expected maintenance document, got {other:?}"),
    }

    match gateway
        .publish(PublishParams::new("https://site.test/", "<p>notice</p>"))
        .await
    {
        Some(PublishResponse::Maintenance(doc)) => {
            assert_eq!(doc.status, STATUS_OK);
            assert_eq!(doc.html.as_deref(), Some("<p>notice</p>"));
        }
        other => panic!("expected maintenance document, got {other:?}"),
    }

    assert!(gateway.achieve("https://site.test/").is_none());
    assert!(gateway.evict("https://site.test/").await.is_none());
    assert!(!f.store.dir().exists());
    assert_eq!(f.renderer.renders.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Pool behaviour
// =============================================================================

#[tokio::test]
async fn test_worker_panic_is_isolated() {
    let f = fixture();

    assert!(f.gateway.fetch("https://panic.test/").await.is_none());
    assert!(f.gateway.fetch("https://broken.test/").await.is_none());
    assert!(f.gateway.fetch("https://fine.test/").await.is_some());

    let stats = f.gateway.pool().stats();
    assert_eq!(stats.faulted, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.available, stats.capacity);
}

#[tokio::test]
async fn test_concurrent_fetches_respect_worker_bound() {
    let renderer = FakeRenderer {
        delay_ms: 30,
        ..FakeRenderer::default()
    };
    let f = fixture_with(renderer, 2);

    let fetches = (0..6).map(|i| {
        let gateway = f.gateway.clone();
        async move { gateway.fetch(&format!("https://site.test/{i}")).await }
    });
    let results = futures::future::join_all(fetches).await;

    assert!(results.iter().all(Option::is_some));
    assert_eq!(f.renderer.renders.load(Ordering::SeqCst), 6);
    assert!(f.renderer.peak.load(Ordering::SeqCst) <= 2);
    assert!(f.gateway.pool().stats().peak_in_flight <= 2);
}

#[tokio::test]
async fn test_shut_down_pool_answers_none() {
    let f = fixture();
    f.gateway.pool().shutdown();
    assert!(f.gateway.fetch("https://site.test/").await.is_none());
    assert!(f.gateway.evict("https://site.test/").await.is_none());
}

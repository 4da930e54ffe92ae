//! Reaper daemon.
//!
//! Runs the three sweeps on their own intervals until cancelled:
//!
//! 1. Artifact sweep: evicts idle tier files and forwards renewal hints
//! 2. Session sweep: deletes idle browser profiles after verification
//! 3. Page sweep: deletes old scratch pages
//!
//! Each schedule runs its own loop, so a slow session sweep never holds back
//! artifact eviction. Within a loop a sweep completes before the next tick
//! is observed. Missed ticks are delayed, not burst.
//!
//! # Example
//!
//! ```ignore
//! let daemon = ReaperDaemon::new(pool, Arc::new(ChromeInspector::default()))
//!     .with_artifacts(ArtifactSchedule::new(pages_dir))
//!     .with_sessions(SessionSchedule::new(session_dir));
//!
//! tokio::spawn(daemon.run(shutdown_token));
//! ```

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::artifact::{sweep_artifacts, CheckOptions, RenewalHint, DEFAULT_ARTIFACT_CONCURRENCY};
use super::inspect::SessionInspector;
use super::session::{sweep_pages, sweep_sessions, SessionSweepOptions, DEFAULT_KEEP_MINUTES};
use crate::pool::TaskPool;
use crate::time::minutes;

/// Default interval of the session sweep.
pub const DEFAULT_SESSION_INTERVAL_SECS: u64 = 300;

/// Default interval of the page sweep.
pub const DEFAULT_PAGE_INTERVAL_SECS: u64 = 300;

/// Longest interval any schedule is stretched to.
const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Artifact sweep schedule. Runs every `options.schedule` unless overridden.
#[derive(Debug, Clone)]
pub struct ArtifactSchedule {
    pub dir: PathBuf,
    pub options: CheckOptions,
    pub interval: Duration,
    pub concurrency: usize,
}

impl ArtifactSchedule {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let options = CheckOptions::default();
        Self {
            dir: dir.into(),
            interval: options.schedule,
            options,
            concurrency: DEFAULT_ARTIFACT_CONCURRENCY,
        }
    }

    pub fn with_options(mut self, options: CheckOptions) -> Self {
        self.interval = options.schedule;
        self.options = options;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Session sweep schedule.
#[derive(Debug, Clone)]
pub struct SessionSchedule {
    pub dir: PathBuf,
    pub options: SessionSweepOptions,
    pub interval: Duration,
}

impl SessionSchedule {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            options: SessionSweepOptions::default(),
            interval: Duration::from_secs(DEFAULT_SESSION_INTERVAL_SECS),
        }
    }

    pub fn with_options(mut self, options: SessionSweepOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Page sweep schedule.
#[derive(Debug, Clone)]
pub struct PageSchedule {
    pub dir: PathBuf,
    pub keep: Duration,
    pub interval: Duration,
}

impl PageSchedule {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            keep: minutes(DEFAULT_KEEP_MINUTES),
            interval: Duration::from_secs(DEFAULT_PAGE_INTERVAL_SECS),
        }
    }

    pub fn with_keep(mut self, keep: Duration) -> Self {
        self.keep = keep;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Background daemon running the reaper sweeps.
pub struct ReaperDaemon {
    pool: TaskPool,
    inspector: Arc<dyn SessionInspector>,
    artifacts: Option<ArtifactSchedule>,
    sessions: Option<SessionSchedule>,
    pages: Option<PageSchedule>,
    renewals: Option<mpsc::Sender<RenewalHint>>,
}

impl ReaperDaemon {
    /// Creates a daemon with no sweeps enabled.
    pub fn new(pool: TaskPool, inspector: Arc<dyn SessionInspector>) -> Self {
        Self {
            pool,
            inspector,
            artifacts: None,
            sessions: None,
            pages: None,
            renewals: None,
        }
    }

    pub fn with_artifacts(mut self, schedule: ArtifactSchedule) -> Self {
        self.artifacts = Some(schedule);
        self
    }

    pub fn with_sessions(mut self, schedule: SessionSchedule) -> Self {
        self.sessions = Some(schedule);
        self
    }

    pub fn with_pages(mut self, schedule: PageSchedule) -> Self {
        self.pages = Some(schedule);
        self
    }

    /// Forwards artifacts that need a revalidate to `sender`.
    pub fn with_renewal_channel(mut self, sender: mpsc::Sender<RenewalHint>) -> Self {
        self.renewals = Some(sender);
        self
    }

    /// True when at least one sweep is scheduled.
    pub fn has_work(&self) -> bool {
        self.artifacts.is_some() || self.sessions.is_some() || self.pages.is_some()
    }

    /// Runs the sweeps until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            artifacts = self.artifacts.is_some(),
            sessions = self.sessions.is_some(),
            pages = self.pages.is_some(),
            "Reaper daemon starting"
        );

        tokio::join!(
            self.artifact_loop(&shutdown),
            self.session_loop(&shutdown),
            self.page_loop(&shutdown),
        );
        info!("Reaper daemon stopped");
    }

    async fn artifact_loop(&self, shutdown: &CancellationToken) {
        if let Some(schedule) = &self.artifacts {
            every(schedule.interval, shutdown, || self.sweep_artifacts_once(schedule)).await;
        }
    }

    async fn session_loop(&self, shutdown: &CancellationToken) {
        if let Some(schedule) = &self.sessions {
            every(schedule.interval, shutdown, || self.sweep_sessions_once(schedule)).await;
        }
    }

    async fn page_loop(&self, shutdown: &CancellationToken) {
        if let Some(schedule) = &self.pages {
            every(schedule.interval, shutdown, || sweep_pages_once(schedule)).await;
        }
    }

    async fn sweep_artifacts_once(&self, schedule: &ArtifactSchedule) {
        let sweep = sweep_artifacts(
            &self.pool,
            &schedule.dir,
            schedule.options,
            schedule.concurrency,
        )
        .await;
        debug!(report = %sweep.report, "Artifact sweep tick");

        if let Some(sender) = &self.renewals {
            for hint in sweep.renewals {
                if let Err(e) = sender.try_send(hint) {
                    warn!(error = %e, "Dropping renewal hint");
                }
            }
        }
    }

    async fn sweep_sessions_once(&self, schedule: &SessionSchedule) {
        let report = sweep_sessions(
            &self.pool,
            self.inspector.as_ref(),
            &schedule.dir,
            &schedule.options,
        )
        .await;
        debug!(%report, "Session sweep tick");
    }
}

async fn sweep_pages_once(schedule: &PageSchedule) {
    let report = sweep_pages(&schedule.dir, schedule.keep).await;
    debug!(%report, "Page sweep tick");
}

/// Runs `sweep` on every tick of `period` until `shutdown` is cancelled.
/// A sweep still running at shutdown is dropped.
async fn every<F, Fut>(period: Duration, shutdown: &CancellationToken, mut sweep: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticks = interval(period);
    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,

            _ = ticks.tick() => {}
        }

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,

            _ = sweep() => {}
        }
    }
}

fn interval(period: Duration) -> Interval {
    let period = period.clamp(Duration::from_millis(1), MAX_INTERVAL);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactStore;
    use crate::pool::{BoxFuture, PoolConfig};
    use crate::reaper::InspectError;
    use crate::transform::HtmlTransformer;
    use crate::worker::{ExternalRenderer, PageWorker};
    use filetime::FileTime;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::SystemTime;
    use tempfile::TempDir;

    struct IdleInspector;

    impl SessionInspector for IdleInspector {
        fn open_page_count<'a>(
            &'a self,
            _session_dir: &'a Path,
        ) -> BoxFuture<'a, Result<usize, InspectError>> {
            Box::pin(async { Ok(1) })
        }
    }

    fn daemon(dir: &Path) -> ReaperDaemon {
        let renderer = ExternalRenderer::from_template("true").unwrap();
        let worker = PageWorker::new(ArtifactStore::new(dir), renderer, HtmlTransformer::default());
        ReaperDaemon::new(TaskPool::new(worker, PoolConfig::new(2)), Arc::new(IdleInspector))
    }

    fn age(path: &Path, secs: u64) {
        let t = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(secs));
        filetime::set_file_times(path, t, t).unwrap();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_schedule_defaults() {
        let artifacts = ArtifactSchedule::new("/pages");
        assert_eq!(artifacts.interval, Duration::from_millis(30_000));
        assert_eq!(artifacts.options.threshold(), Duration::from_millis(15_000));

        let sessions = SessionSchedule::new("/sessions");
        assert_eq!(sessions.options.keep, Duration::from_secs(60));

        let pages = PageSchedule::new("/scratch").with_keep(Duration::from_secs(5));
        assert_eq!(pages.keep, Duration::from_secs(5));
    }

    #[test]
    fn test_artifact_interval_follows_schedule() {
        let schedule = ArtifactSchedule::new("/pages")
            .with_options(CheckOptions::with_schedule(Duration::from_secs(10)));
        assert_eq!(schedule.interval, Duration::from_secs(10));
    }

    #[test]
    fn test_has_work() {
        let temp = TempDir::new().unwrap();
        assert!(!daemon(temp.path()).has_work());
        assert!(daemon(temp.path())
            .with_pages(PageSchedule::new(temp.path()))
            .has_work());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Run loop
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_shutdown_without_schedules() {
        let temp = TempDir::new().unwrap();
        let token = CancellationToken::new();
        let handle = tokio::spawn(daemon(temp.path()).run(token.clone()));

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("daemon should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_first_tick_sweeps_everything() {
        let temp = TempDir::new().unwrap();
        let pages_dir = temp.path().join("pages");
        let session_dir = temp.path().join("sessions");
        let scratch_dir = temp.path().join("scratch");
        for dir in [&pages_dir, &session_dir, &scratch_dir] {
            std::fs::create_dir_all(dir).unwrap();
        }

        let artifact = pages_dir.join("old.br");
        std::fs::write(&artifact, b"x").unwrap();
        age(&artifact, 600);
        let renewing = pages_dir.join("young.renew.br");
        std::fs::write(&renewing, b"x").unwrap();
        let session = session_dir.join("profile-1");
        std::fs::create_dir_all(&session).unwrap();
        age(&session, 600);
        let scratch = scratch_dir.join("page.html");
        std::fs::write(&scratch, b"x").unwrap();
        age(&scratch, 600);

        let (tx, mut rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let handle = tokio::spawn(
            daemon(&pages_dir)
                .with_artifacts(ArtifactSchedule::new(&pages_dir).with_interval(Duration::from_secs(3600)))
                .with_sessions(SessionSchedule::new(&session_dir).with_interval(Duration::from_secs(3600)))
                .with_pages(PageSchedule::new(&scratch_dir).with_interval(Duration::from_secs(3600)))
                .with_renewal_channel(tx)
                .run(token.clone()),
        );

        let hint = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("renewal hint")
            .expect("channel open");
        assert_eq!(hint.key.as_str(), "young");

        // Remaining first ticks run right after the artifact sweep.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while (session.exists() || scratch.exists()) && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        token.cancel();
        handle.await.unwrap();

        assert!(!artifact.exists());
        assert!(renewing.exists());
        assert!(!session.exists());
        assert!(!scratch.exists());
    }

    /// Never answers, holding the session sweep open.
    struct StuckInspector {
        entered: Arc<AtomicBool>,
    }

    impl SessionInspector for StuckInspector {
        fn open_page_count<'a>(
            &'a self,
            _session_dir: &'a Path,
        ) -> BoxFuture<'a, Result<usize, InspectError>> {
            self.entered.store(true, Ordering::SeqCst);
            Box::pin(std::future::pending::<Result<usize, InspectError>>())
        }
    }

    async fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + deadline;
        while !done() {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        true
    }

    #[tokio::test]
    async fn test_slow_session_sweep_does_not_delay_artifact_eviction() {
        let temp = TempDir::new().unwrap();
        let pages_dir = temp.path().join("pages");
        let session_dir = temp.path().join("sessions");
        std::fs::create_dir_all(&pages_dir).unwrap();
        let session = session_dir.join("profile-1");
        std::fs::create_dir_all(&session).unwrap();
        age(&session, 600);

        let entered = Arc::new(AtomicBool::new(false));
        let inspector = StuckInspector {
            entered: Arc::clone(&entered),
        };
        let renderer = ExternalRenderer::from_template("true").unwrap();
        let worker = PageWorker::new(
            ArtifactStore::new(&pages_dir),
            renderer,
            HtmlTransformer::default(),
        );
        let token = CancellationToken::new();
        let handle = tokio::spawn(
            ReaperDaemon::new(TaskPool::new(worker, PoolConfig::new(2)), Arc::new(inspector))
                .with_artifacts(
                    ArtifactSchedule::new(&pages_dir).with_interval(Duration::from_millis(50)),
                )
                .with_sessions(SessionSchedule::new(&session_dir))
                .run(token.clone()),
        );

        assert!(wait_until(Duration::from_secs(5), || entered.load(Ordering::SeqCst)).await);

        // Written while the session sweep is still waiting on the inspector.
        let artifact = pages_dir.join("idle.br");
        std::fs::write(&artifact, b"x").unwrap();
        age(&artifact, 600);
        assert!(wait_until(Duration::from_secs(5), || !artifact.exists()).await);
        assert!(session.exists());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("daemon should stop mid-sweep")
            .unwrap();
    }
}

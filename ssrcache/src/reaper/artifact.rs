//! Idle eviction of tier files.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use super::SweepReport;
use crate::artifact::{parse_artifact_name, raw_variant, ArtifactTier, CacheKey, FileInfo};
use crate::pool::{TaskOutput, TaskPool, WorkerTask};
use crate::time::age_at;

/// Default scheduling period of the artifact sweep.
pub const DEFAULT_SCHEDULE: Duration = Duration::from_millis(30_000);

/// Default number of artifacts checked at once during a sweep.
pub const DEFAULT_ARTIFACT_CONCURRENCY: usize = 16;

/// Thresholds for [`check_artifact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    pub schedule: Duration,
    /// Idle window within which an artifact is kept. Half the schedule when
    /// unset.
    pub valid_request_at: Option<Duration>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            schedule: DEFAULT_SCHEDULE,
            valid_request_at: None,
        }
    }
}

impl CheckOptions {
    pub fn with_schedule(schedule: Duration) -> Self {
        Self {
            schedule,
            valid_request_at: None,
        }
    }

    pub fn with_valid_request_at(mut self, window: Duration) -> Self {
        self.valid_request_at = Some(window);
        self
    }

    /// The idle window actually applied.
    pub fn threshold(&self) -> Duration {
        self.valid_request_at.unwrap_or(self.schedule / 2)
    }
}

/// Outcome of [`check_artifact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The artifact was idle past its window (or absent). `true` when a file
    /// was actually removed.
    Evicted(bool),
    /// Still inside its serve window; schedule a revalidate.
    NeedsRenewal,
}

/// An artifact that is ageing but still servable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewalHint {
    pub key: CacheKey,
    pub tier: ArtifactTier,
    pub path: PathBuf,
}

/// Result of [`sweep_artifacts`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSweep {
    /// `kept_young` counts artifacts returned as renewal hints.
    pub report: SweepReport,
    pub evicted: Vec<PathBuf>,
    pub renewals: Vec<RenewalHint>,
}

/// Evicts `path` if it has been idle longer than the configured window.
///
/// Idleness is measured from the later of the last request (access time)
/// and the last write. A missing path falls back to its raw-tier variant.
/// Deletion goes through the pool. Faults are logged and reported as
/// `Evicted(false)`.
pub async fn check_artifact(pool: &TaskPool, path: &Path, options: CheckOptions) -> CheckOutcome {
    check_artifact_at(pool, path, options, SystemTime::now()).await
}

pub(crate) async fn check_artifact_at(
    pool: &TaskPool,
    path: &Path,
    options: CheckOptions,
    now: SystemTime,
) -> CheckOutcome {
    if path.as_os_str().is_empty() {
        error!("check_artifact needs a file path");
        return CheckOutcome::Evicted(false);
    }

    let Some(path) = locate_artifact(path).await else {
        debug!(path = %path.display(), "Artifact already gone");
        return CheckOutcome::Evicted(false);
    };

    let info = match FileInfo::read_async(&path).await {
        Ok(info) => info,
        Err(e) => {
            warn!(error = %e, "Cannot stat artifact");
            return CheckOutcome::Evicted(false);
        }
    };

    let idle = age_at(info.last_activity(), now);
    if idle <= options.threshold() {
        return CheckOutcome::NeedsRenewal;
    }

    match pool.run(WorkerTask::delete_resource(&path)).await {
        Some(TaskOutput::Deleted(removed)) => {
            if removed {
                info!(path = %path.display(), idle_ms = idle.as_millis() as u64, "Artifact permanently deleted");
            }
            CheckOutcome::Evicted(removed)
        }
        Some(other) => {
            warn!(?other, "Unexpected output for delete");
            CheckOutcome::Evicted(false)
        }
        None => CheckOutcome::Evicted(false),
    }
}

/// The file [`check_artifact`] would inspect for `path`: the path itself,
/// else its raw-tier variant. `None` when neither exists.
pub async fn locate_artifact(path: &Path) -> Option<PathBuf> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Some(path.to_path_buf());
    }
    let variant = raw_variant(path)?;
    tokio::fs::try_exists(&variant)
        .await
        .unwrap_or(false)
        .then_some(variant)
}

/// Runs [`check_artifact`] over every tier file in `dir`.
///
/// Files that are not tier files (temp files, strays) are ignored. A
/// missing directory is an empty sweep.
pub async fn sweep_artifacts(
    pool: &TaskPool,
    dir: &Path,
    options: CheckOptions,
    concurrency: usize,
) -> ArtifactSweep {
    sweep_artifacts_at(pool, dir, options, concurrency, SystemTime::now()).await
}

pub(crate) async fn sweep_artifacts_at(
    pool: &TaskPool,
    dir: &Path,
    options: CheckOptions,
    concurrency: usize,
    now: SystemTime,
) -> ArtifactSweep {
    let candidates = match list_tier_files(dir).await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot list artifact directory");
            return ArtifactSweep::default();
        }
    };

    let outcomes: Vec<_> = stream::iter(candidates)
        .map(|(path, key, tier)| async move {
            let outcome = check_artifact_at(pool, &path, options, now).await;
            (path, key, tier, outcome)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut sweep = ArtifactSweep::default();
    for (path, key, tier, outcome) in outcomes {
        sweep.report.scanned += 1;
        match outcome {
            CheckOutcome::Evicted(true) => {
                sweep.report.deleted += 1;
                sweep.evicted.push(path);
            }
            CheckOutcome::Evicted(false) => sweep.report.failed += 1,
            CheckOutcome::NeedsRenewal => {
                sweep.report.kept_young += 1;
                sweep.renewals.push(RenewalHint { key, tier, path });
            }
        }
    }

    debug!(dir = %dir.display(), report = %sweep.report, "Artifact sweep finished");
    sweep
}

async fn list_tier_files(dir: &Path) -> std::io::Result<Vec<(PathBuf, CacheKey, ArtifactTier)>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some((key, tier)) = parse_artifact_name(name) {
            files.push((entry.path(), CacheKey::from_raw(key), tier));
        }
    }
    Ok(files)
}

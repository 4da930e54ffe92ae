//! Age-based sweeps of browser session directories and scratch pages.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::inspect::SessionInspector;
use super::SweepReport;
use crate::pool::{TaskOutput, TaskPool, WorkerTask};
use crate::time::{age_at, minutes};

/// Default minimum age before a session or page is considered.
pub const DEFAULT_KEEP_MINUTES: u64 = 1;

/// Default number of inspection browsers launched at once.
pub const DEFAULT_INSPECTION_CONCURRENCY: usize = 2;

/// Settings for [`sweep_sessions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSweepOptions {
    pub keep: Duration,
    /// Session directory of the running browser. Never deleted.
    pub in_use: Option<PathBuf>,
    pub concurrency: usize,
}

impl Default for SessionSweepOptions {
    fn default() -> Self {
        Self {
            keep: minutes(DEFAULT_KEEP_MINUTES),
            in_use: None,
            concurrency: DEFAULT_INSPECTION_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    InUse,
    Young,
    Active,
    Deleted,
    Failed,
}

impl SweepReport {
    fn record(&mut self, outcome: EntryOutcome) {
        self.scanned += 1;
        match outcome {
            EntryOutcome::InUse => self.kept_in_use += 1,
            EntryOutcome::Young => self.kept_young += 1,
            EntryOutcome::Active => self.kept_active += 1,
            EntryOutcome::Deleted => self.deleted += 1,
            EntryOutcome::Failed => self.failed += 1,
        }
    }

    fn from_outcomes(outcomes: impl IntoIterator<Item = EntryOutcome>) -> Self {
        let mut report = Self::default();
        for outcome in outcomes {
            report.record(outcome);
        }
        report
    }
}

/// Deletes idle browser session directories under `dir`.
///
/// Each immediate subdirectory is classified independently:
/// - the in-use directory is skipped without inspection;
/// - directories modified less than `keep` ago are skipped;
/// - older directories are opened by `inspector`; with at most one open
///   page they are deleted through the pool, otherwise kept.
///
/// A failed inspection keeps the directory. Resolves once every entry has
/// been classified.
pub async fn sweep_sessions(
    pool: &TaskPool,
    inspector: &dyn SessionInspector,
    dir: &Path,
    options: &SessionSweepOptions,
) -> SweepReport {
    sweep_sessions_at(pool, inspector, dir, options, SystemTime::now()).await
}

pub(crate) async fn sweep_sessions_at(
    pool: &TaskPool,
    inspector: &dyn SessionInspector,
    dir: &Path,
    options: &SessionSweepOptions,
    now: SystemTime,
) -> SweepReport {
    let entries = match list_entries(dir, true).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot list session directory");
            return SweepReport::default();
        }
    };
    if entries.is_empty() {
        return SweepReport::default();
    }

    let in_use = match options.in_use.as_deref() {
        Some(path) => Some(normalize(path).await),
        None => None,
    };
    let outcomes: Vec<EntryOutcome> = stream::iter(entries)
        .map(|(path, modified)| {
            let in_use = in_use.as_deref();
            async move {
                if let Some(in_use) = in_use {
                    if normalize(&path).await == in_use {
                        debug!(path = %path.display(), "Session in use, skipping");
                        return EntryOutcome::InUse;
                    }
                }
                if age_at(modified, now) < options.keep {
                    return EntryOutcome::Young;
                }
                reap_session(pool, inspector, &path).await
            }
        })
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;

    let report = SweepReport::from_outcomes(outcomes);
    info!(dir = %dir.display(), %report, "Session sweep finished");
    report
}

async fn reap_session(
    pool: &TaskPool,
    inspector: &dyn SessionInspector,
    path: &Path,
) -> EntryOutcome {
    let pages = match inspector.open_page_count(path).await {
        Ok(pages) => pages,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Session inspection failed, keeping");
            return EntryOutcome::Active;
        }
    };

    if pages > 1 {
        debug!(path = %path.display(), pages, "Session active, keeping");
        return EntryOutcome::Active;
    }

    match pool.run(WorkerTask::delete_resource(path)).await {
        Some(TaskOutput::Deleted(true)) => {
            info!(path = %path.display(), "Session directory deleted");
            EntryOutcome::Deleted
        }
        _ => EntryOutcome::Failed,
    }
}

/// Deletes entries of `dir` modified at least `keep` ago.
///
/// No active-use check: scratch pages carry no process-owned state.
/// Deletion is a direct filesystem call.
pub async fn sweep_pages(dir: &Path, keep: Duration) -> SweepReport {
    sweep_pages_at(dir, keep, SystemTime::now()).await
}

pub(crate) async fn sweep_pages_at(dir: &Path, keep: Duration, now: SystemTime) -> SweepReport {
    let entries = match list_entries(dir, false).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot list page directory");
            return SweepReport::default();
        }
    };
    if entries.is_empty() {
        return SweepReport::default();
    }

    let outcomes = join_all(entries.into_iter().map(|(path, modified)| async move {
        if age_at(modified, now) < keep {
            return EntryOutcome::Young;
        }
        let result = if tokio::fs::symlink_metadata(&path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        match result {
            Ok(()) => EntryOutcome::Deleted,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to delete page");
                EntryOutcome::Failed
            }
        }
    }))
    .await;

    let report = SweepReport::from_outcomes(outcomes);
    debug!(dir = %dir.display(), %report, "Page sweep finished");
    report
}

/// Entries of `dir` with their modification time. A missing directory is
/// empty. Entries that vanish or cannot be stat'ed are skipped.
async fn list_entries(dir: &Path, dirs_only: bool) -> std::io::Result<Vec<(PathBuf, SystemTime)>> {
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut entries = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(path = %entry.path().display(), error = %e, "Skipping entry");
                continue;
            }
        };
        if dirs_only && !metadata.is_dir() {
            continue;
        }
        let modified = metadata.modified().unwrap_or_else(|_| SystemTime::now());
        entries.push((entry.path(), modified));
    }
    Ok(entries)
}

async fn normalize(path: &Path) -> PathBuf {
    match tokio::fs::canonicalize(path).await {
        Ok(path) => path,
        Err(_) => path.components().collect(),
    }
}

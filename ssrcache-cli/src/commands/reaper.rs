//! Reaper commands: the daemon, single artifact checks and one-shot sweeps.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Subcommand;
use ssrcache::reaper::{
    check_artifact, locate_artifact, sweep_artifacts, sweep_pages, sweep_sessions, CheckOutcome,
    ReaperDaemon, DEFAULT_ARTIFACT_CONCURRENCY,
};
use ssrcache::time::minutes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::output::print_report;
use crate::error::CliError;
use crate::runner::{CliRunner, RunnerOptions};

/// Pending renewal hints held before the daemon starts dropping them.
const RENEWAL_CHANNEL_CAPACITY: usize = 256;

/// Sweep targets.
#[derive(Debug, Subcommand)]
pub enum SweepTarget {
    /// Delete idle browser session directories
    Sessions {
        /// Session root (default: [reaper] session_dir)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Delete old scratch pages
    Pages {
        /// Scratch directory (default: [reaper] scratch_dir)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Evict idle artifacts from the cache directory
    Artifacts {
        /// Cache directory (default: [cache] directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

/// Runs the reaper daemon until Ctrl-C.
pub async fn run_daemon(options: RunnerOptions) -> Result<(), CliError> {
    let runner = CliRunner::for_daemon(&options)?;
    runner.log_startup("run");
    let config = runner.config();

    let pool = runner.pool();
    let (renewal_tx, mut renewal_rx) = mpsc::channel(RENEWAL_CHANNEL_CAPACITY);

    let mut daemon = ReaperDaemon::new(pool.clone(), Arc::new(config.inspector()))
        .with_artifacts(config.artifact_schedule())
        .with_renewal_channel(renewal_tx);
    match config.session_schedule() {
        Some(schedule) => daemon = daemon.with_sessions(schedule),
        None => info!("Session sweep disabled (no [reaper] session_dir)"),
    }
    match config.page_schedule() {
        Some(schedule) => daemon = daemon.with_pages(schedule),
        None => info!("Page sweep disabled (no [reaper] scratch_dir)"),
    }

    let renewals = tokio::spawn(async move {
        while let Some(hint) = renewal_rx.recv().await {
            debug!(key = %hint.key, tier = %hint.tier, "Artifact due for renewal");
        }
    });

    let shutdown = CancellationToken::new();
    let daemon_handle = tokio::spawn(daemon.run(shutdown.clone()));
    println!("Reaper running. Press Ctrl-C to stop.");

    let signal = tokio::signal::ctrl_c().await;
    info!("Shutting down reaper");
    shutdown.cancel();
    if let Err(e) = daemon_handle.await {
        warn!(error = %e, "Reaper daemon task failed");
    }
    pool.shutdown();
    // The daemon owned the only sender, so the consumer ends on its own.
    let _ = renewals.await;

    signal.map_err(CliError::Signal)
}

/// Checks one artifact file. An absent artifact is a no-op.
pub async fn check(options: RunnerOptions, path: &Path) -> Result<(), CliError> {
    let runner = CliRunner::new(&options)?;
    if locate_artifact(path).await.is_none() {
        println!("Nothing to do: {} is absent", path.display());
        return Ok(());
    }

    let check_options = runner.config().check_options();
    let pool = runner.pool();

    match check_artifact(&pool, path, check_options).await {
        CheckOutcome::Evicted(true) => println!("Evicted {}", path.display()),
        CheckOutcome::Evicted(false) => {
            return Err(CliError::NoResult(format!(
                "Could not evict {}",
                path.display()
            )))
        }
        CheckOutcome::NeedsRenewal => println!(
            "Kept {} (requested within the last {:?})",
            path.display(),
            check_options.threshold()
        ),
    }
    Ok(())
}

/// Runs one sweep.
pub async fn sweep(options: RunnerOptions, target: SweepTarget) -> Result<(), CliError> {
    let runner = CliRunner::new(&options)?;
    let config = runner.config();

    match target {
        SweepTarget::Sessions { dir } => {
            let dir = required_dir(dir, config.reaper.session_dir.as_ref(), "session_dir")?;
            let pool = runner.pool();
            let inspector = config.inspector();
            let report =
                sweep_sessions(&pool, &inspector, &dir, &config.session_options()).await;
            print_report("Session", &report);
        }
        SweepTarget::Pages { dir } => {
            let dir = required_dir(dir, config.reaper.scratch_dir.as_ref(), "scratch_dir")?;
            let report = sweep_pages(&dir, minutes(config.reaper.page_keep_minutes)).await;
            print_report("Page", &report);
        }
        SweepTarget::Artifacts { dir } => {
            let dir = dir.unwrap_or_else(|| config.cache.directory.clone());
            let pool = runner.pool();
            let sweep = sweep_artifacts(
                &pool,
                &dir,
                config.check_options(),
                DEFAULT_ARTIFACT_CONCURRENCY,
            )
            .await;
            print_report("Artifact", &sweep.report);
            for path in &sweep.evicted {
                println!("  evicted {}", path.display());
            }
            if !sweep.renewals.is_empty() {
                println!("  {} artifact(s) due for renewal", sweep.renewals.len());
            }
        }
    }
    Ok(())
}

fn required_dir(
    arg: Option<PathBuf>,
    configured: Option<&PathBuf>,
    key: &str,
) -> Result<PathBuf, CliError> {
    arg.or_else(|| configured.cloned()).ok_or_else(|| {
        CliError::Usage(format!(
            "No directory given. Pass --dir or set [reaper] {} in config.ini",
            key
        ))
    })
}

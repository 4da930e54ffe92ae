//! Resource reaper.
//!
//! Three independent, idempotent sweeps:
//!
//! | sweep | target | eviction signal | deletion |
//! |---|---|---|---|
//! | [`check_artifact`] / [`sweep_artifacts`] | tier files | idle past window | pool |
//! | [`sweep_sessions`] | browser profiles | age + ≤1 open page | pool |
//! | [`sweep_pages`] | scratch pages | age | direct |
//!
//! Sweeps only touch filesystem entries, so sweeps over disjoint
//! directories may run concurrently. [`ReaperDaemon`] schedules them.

mod artifact;
mod daemon;
mod inspect;
mod session;

use std::fmt;

pub use artifact::{
    check_artifact, locate_artifact, sweep_artifacts, ArtifactSweep, CheckOptions, CheckOutcome,
    RenewalHint, DEFAULT_ARTIFACT_CONCURRENCY, DEFAULT_SCHEDULE,
};
pub use daemon::{
    ArtifactSchedule, PageSchedule, ReaperDaemon, SessionSchedule, DEFAULT_PAGE_INTERVAL_SECS,
    DEFAULT_SESSION_INTERVAL_SECS,
};
pub use inspect::{
    find_in_path, parse_devtools_port, resolve_executable, ChromeInspector, InspectError,
    SessionInspector, BROWSER_NAMES, DEFAULT_LAUNCH_TIMEOUT,
};
pub use session::{
    sweep_pages, sweep_sessions, SessionSweepOptions, DEFAULT_INSPECTION_CONCURRENCY,
    DEFAULT_KEEP_MINUTES,
};

/// Per-entry tally of one sweep. Every scanned entry lands in exactly one
/// of the other counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub kept_in_use: usize,
    pub kept_active: usize,
    pub kept_young: usize,
    pub failed: usize,
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned={} deleted={} in_use={} active={} young={} failed={}",
            self.scanned,
            self.deleted,
            self.kept_in_use,
            self.kept_active,
            self.kept_young,
            self.failed
        )
    }
}

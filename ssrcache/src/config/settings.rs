//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

use crate::transform::TransformConfig;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub workers: WorkerSettings,
    pub reaper: ReaperSettings,
    pub browser: BrowserSettings,
    pub render: RenderSettings,
    /// `[optimize]` maps one-to-one onto the transform pipeline switches.
    pub optimize: TransformConfig,
}

/// Artifact directory and maintenance switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Directory holding the tier files
    pub directory: PathBuf,
    /// When true the gateway answers with the maintenance document
    pub maintenance: bool,
    /// Static page served during maintenance
    pub maintenance_page: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Render worker slots, at least one
    pub max_workers: usize,
}

/// Sweep windows and intervals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaperSettings {
    /// Artifact sweep schedule in milliseconds
    pub schedule_ms: u64,
    /// Artifact idle window; half the schedule when unset
    pub valid_request_ms: Option<u64>,
    /// Artifact sweep interval; follows the schedule when unset
    pub artifact_interval_secs: Option<u64>,
    /// Browser session root; session sweep disabled when unset
    pub session_dir: Option<PathBuf>,
    /// Session directory of the running browser
    pub session_in_use: Option<PathBuf>,
    pub session_keep_minutes: u64,
    pub session_interval_secs: u64,
    /// Browsers launched at once for session inspection
    pub inspection_concurrency: usize,
    /// Scratch page directory; page sweep disabled when unset
    pub scratch_dir: Option<PathBuf>,
    pub page_keep_minutes: u64,
    pub page_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSettings {
    /// Explicit browser binary; `PATH` is searched when unset
    pub executable: Option<PathBuf>,
    pub launch_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    /// Render command template with a `{url}` placeholder
    pub command: Option<String>,
    pub timeout_secs: u64,
}

//! Default values for all configuration settings and the
//! `ConfigFile::default()` implementation.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::pool::DEFAULT_MAX_WORKERS;
use crate::reaper::{
    DEFAULT_INSPECTION_CONCURRENCY, DEFAULT_KEEP_MINUTES, DEFAULT_LAUNCH_TIMEOUT,
    DEFAULT_PAGE_INTERVAL_SECS, DEFAULT_SCHEDULE, DEFAULT_SESSION_INTERVAL_SECS,
};
use crate::transform::TransformConfig;
use crate::worker::DEFAULT_RENDER_TIMEOUT;

/// Artifact directory name under the config directory.
pub const DEFAULT_CACHE_DIR_NAME: &str = "cache";

/// Maintenance page file name under the config directory.
pub const DEFAULT_MAINTENANCE_PAGE_NAME: &str = "maintenance.html";

pub const DEFAULT_SCHEDULE_MS: u64 = DEFAULT_SCHEDULE.as_millis() as u64;

/// Default artifact directory (`~/.ssrcache/cache`).
pub fn default_cache_dir() -> PathBuf {
    config_directory().join(DEFAULT_CACHE_DIR_NAME)
}

/// Default maintenance page (`~/.ssrcache/maintenance.html`).
pub fn default_maintenance_page() -> PathBuf {
    config_directory().join(DEFAULT_MAINTENANCE_PAGE_NAME)
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            cache: CacheSettings {
                directory: default_cache_dir(),
                maintenance: false,
                maintenance_page: default_maintenance_page(),
            },
            workers: WorkerSettings {
                max_workers: DEFAULT_MAX_WORKERS,
            },
            reaper: ReaperSettings {
                schedule_ms: DEFAULT_SCHEDULE_MS,
                valid_request_ms: None,
                artifact_interval_secs: None,
                session_dir: None,
                session_in_use: None,
                session_keep_minutes: DEFAULT_KEEP_MINUTES,
                session_interval_secs: DEFAULT_SESSION_INTERVAL_SECS,
                inspection_concurrency: DEFAULT_INSPECTION_CONCURRENCY,
                scratch_dir: None,
                page_keep_minutes: DEFAULT_KEEP_MINUTES,
                page_interval_secs: DEFAULT_PAGE_INTERVAL_SECS,
            },
            browser: BrowserSettings {
                executable: None,
                launch_timeout_secs: DEFAULT_LAUNCH_TIMEOUT.as_secs(),
            },
            render: RenderSettings {
                command: None,
                timeout_secs: DEFAULT_RENDER_TIMEOUT.as_secs(),
            },
            optimize: TransformConfig::default(),
        }
    }
}

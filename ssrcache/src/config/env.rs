//! Environment overrides applied on top of the loaded file.

use std::path::PathBuf;

use tracing::{debug, warn};

use super::parser::parse_bool;
use super::settings::ConfigFile;
use crate::pool::MAX_WORKERS_ENV;

/// Maintenance switch.
pub const MAINTENANCE_ENV: &str = "SSRCACHE_MAINTENANCE";

/// Session directory of the running browser.
pub const SESSION_IN_USE_ENV: &str = "BROWSER_USER_DATA_IN_USED";

/// Browser executable.
pub const CHROME_PATH_ENV: &str = "CHROME_PATH";

impl ConfigFile {
    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Applies overrides read through `lookup`. Empty values are ignored;
    /// an unparseable worker count is ignored with a warning.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(raw) = get(MAX_WORKERS_ENV) {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => {
                    debug!(max_workers = n, "Worker count from environment");
                    self.workers.max_workers = n;
                }
                _ => warn!(value = %raw, "Ignoring invalid {}", MAX_WORKERS_ENV),
            }
        }
        if let Some(raw) = get(MAINTENANCE_ENV) {
            self.cache.maintenance = parse_bool(&raw);
        }
        if let Some(raw) = get(SESSION_IN_USE_ENV) {
            self.reaper.session_in_use = Some(PathBuf::from(raw));
        }
        if let Some(raw) = get(CHROME_PATH_ENV) {
            self.browser.executable = Some(PathBuf::from(raw));
        }
    }
}

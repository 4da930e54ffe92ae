//! Configuration for ssrcache.
//!
//! Settings come from `~/.ssrcache/config.ini`, overlaid onto defaults, and
//! then from a handful of environment variables:
//!
//! | variable | setting |
//! |---|---|
//! | `MAX_WORKERS` | `[workers] max_workers` |
//! | `SSRCACHE_MAINTENANCE` | `[cache] maintenance` |
//! | `BROWSER_USER_DATA_IN_USED` | `[reaper] session_in_use` |
//! | `CHROME_PATH` | `[browser] executable` |
//!
//! # Example
//!
//! ```
//! use ssrcache::config::ConfigFile;
//!
//! let mut config = ConfigFile::default();
//! config.apply_env_from(|name| (name == "MAX_WORKERS").then(|| "2".to_string()));
//! assert_eq!(config.pool_config().max_workers, 2);
//! ```

mod defaults;
mod env;
mod file;
mod parser;
mod runtime;
mod settings;
mod writer;

pub use defaults::{default_cache_dir, default_maintenance_page, DEFAULT_SCHEDULE_MS};
pub use env::{CHROME_PATH_ENV, MAINTENANCE_ENV, SESSION_IN_USE_ENV};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    BrowserSettings, CacheSettings, ConfigFile, ReaperSettings, RenderSettings, WorkerSettings,
};

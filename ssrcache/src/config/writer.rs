//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented representation written by `ssrcache config init`.
//! Unset optional values are written as empty keys so the file documents
//! every setting.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let opt_path = |p: &Option<std::path::PathBuf>| {
        p.as_deref().map(path_to_string).unwrap_or_default()
    };
    let opt_num = |n: Option<u64>| n.map(|n| n.to_string()).unwrap_or_default();

    let reaper = &config.reaper;
    let optimize = &config.optimize;

    format!(
        r#"# ssrcache configuration
# Lines starting with # are comments. Empty values fall back to defaults.

[cache]
# Directory holding rendered pages (one file per key and tier)
directory = {cache_dir}
# Serve the maintenance page instead of cached content
maintenance = {maintenance}
maintenance_page = {maintenance_page}

[workers]
# Concurrent render workers (MAX_WORKERS overrides)
max_workers = {max_workers}

[reaper]
# Artifact sweep schedule in milliseconds
schedule_ms = {schedule_ms}
# Idle window before an artifact is evicted (default: half the schedule)
valid_request_ms = {valid_request_ms}
# Artifact sweep interval (default: the schedule)
artifact_interval_secs = {artifact_interval_secs}
# Browser session profiles; leave empty to disable the session sweep
session_dir = {session_dir}
# Profile of the running browser, never deleted (BROWSER_USER_DATA_IN_USED overrides)
session_in_use = {session_in_use}
session_keep_minutes = {session_keep_minutes}
session_interval_secs = {session_interval_secs}
inspection_concurrency = {inspection_concurrency}
# Scratch pages; leave empty to disable the page sweep
scratch_dir = {scratch_dir}
page_keep_minutes = {page_keep_minutes}
page_interval_secs = {page_interval_secs}

[browser]
# Browser used to inspect sessions; PATH is searched when empty (CHROME_PATH overrides)
executable = {executable}
launch_timeout_secs = {launch_timeout_secs}

[render]
# Command printing rendered HTML on stdout; {{url}} is replaced by the page URL
command = {command}
timeout_secs = {render_timeout_secs}

[optimize]
disable_compress = {disable_compress}
disable_optimize = {disable_optimize}
disable_deep_optimize = {disable_deep_optimize}
# 1 disables minification and deep optimization
power_level = {power_level}
# development or production
environment = {environment}
"#,
        cache_dir = path_to_string(&config.cache.directory),
        maintenance = config.cache.maintenance,
        maintenance_page = path_to_string(&config.cache.maintenance_page),
        max_workers = config.workers.max_workers,
        schedule_ms = reaper.schedule_ms,
        valid_request_ms = opt_num(reaper.valid_request_ms),
        artifact_interval_secs = opt_num(reaper.artifact_interval_secs),
        session_dir = opt_path(&reaper.session_dir),
        session_in_use = opt_path(&reaper.session_in_use),
        session_keep_minutes = reaper.session_keep_minutes,
        session_interval_secs = reaper.session_interval_secs,
        inspection_concurrency = reaper.inspection_concurrency,
        scratch_dir = opt_path(&reaper.scratch_dir),
        page_keep_minutes = reaper.page_keep_minutes,
        page_interval_secs = reaper.page_interval_secs,
        executable = opt_path(&config.browser.executable),
        launch_timeout_secs = config.browser.launch_timeout_secs,
        command = config.render.command.as_deref().unwrap_or(""),
        render_timeout_secs = config.render.timeout_secs,
        disable_compress = optimize.disable_compress,
        disable_optimize = optimize.disable_optimize,
        disable_deep_optimize = optimize.disable_deep_optimize,
        power_level = optimize.power_level,
        environment = optimize.environment,
    )
}

/// Collapse the home directory back to `~` for readability.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::super::settings::ConfigFile;
    use crate::transform::PowerLevel;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.cache.directory = PathBuf::from("/var/cache/ssr");
        config.workers.max_workers = 12;
        config.reaper.valid_request_ms = Some(20000);
        config.reaper.session_dir = Some(PathBuf::from("/tmp/profiles"));
        config.render.command = Some("render-page {url}".to_string());
        config.optimize.power_level = PowerLevel::One;
        config.optimize.disable_deep_optimize = true;

        config.save_to(&config_path).unwrap();
        let loaded = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_defaults_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.ini");

        ConfigFile::default().save_to(&config_path).unwrap();
        let loaded = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(loaded, ConfigFile::default());
    }

    #[test]
    fn test_written_file_documents_placeholder() {
        let content = super::to_config_string(&ConfigFile::default());
        assert!(content.contains("{url} is replaced"));
        assert!(content.contains("max_workers = 7"));
        assert!(content.contains("valid_request_ms = \n"));
    }
}

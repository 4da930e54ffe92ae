//! INI parsing logic for converting an `Ini` document into a `ConfigFile`.
//!
//! Parsing starts from `ConfigFile::default()` and overlays every key the
//! file sets. Unknown keys are ignored; malformed values fail with the
//! offending section and key.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an INI document into a `ConfigFile`.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = non_empty(section.get("directory")) {
            config.cache.directory = expand_tilde(v);
        }
        if let Some(v) = section.get("maintenance") {
            config.cache.maintenance = parse_bool(v);
        }
        if let Some(v) = non_empty(section.get("maintenance_page")) {
            config.cache.maintenance_page = expand_tilde(v);
        }
    }

    if let Some(section) = ini.section(Some("workers")) {
        if let Some(v) = non_empty(section.get("max_workers")) {
            let workers: usize = parse_value("workers", "max_workers", v)?;
            if workers == 0 {
                return Err(invalid("workers", "max_workers", v, "must be at least 1"));
            }
            config.workers.max_workers = workers;
        }
    }

    if let Some(section) = ini.section(Some("reaper")) {
        let reaper = &mut config.reaper;
        if let Some(v) = non_empty(section.get("schedule_ms")) {
            let schedule: u64 = parse_value("reaper", "schedule_ms", v)?;
            if schedule == 0 {
                return Err(invalid("reaper", "schedule_ms", v, "must be positive"));
            }
            reaper.schedule_ms = schedule;
        }
        if let Some(v) = non_empty(section.get("valid_request_ms")) {
            reaper.valid_request_ms = Some(parse_value("reaper", "valid_request_ms", v)?);
        }
        if let Some(v) = non_empty(section.get("artifact_interval_secs")) {
            reaper.artifact_interval_secs =
                Some(parse_value("reaper", "artifact_interval_secs", v)?);
        }
        if let Some(v) = non_empty(section.get("session_dir")) {
            reaper.session_dir = Some(expand_tilde(v));
        }
        if let Some(v) = non_empty(section.get("session_in_use")) {
            reaper.session_in_use = Some(expand_tilde(v));
        }
        if let Some(v) = non_empty(section.get("session_keep_minutes")) {
            reaper.session_keep_minutes = parse_value("reaper", "session_keep_minutes", v)?;
        }
        if let Some(v) = non_empty(section.get("session_interval_secs")) {
            reaper.session_interval_secs = parse_value("reaper", "session_interval_secs", v)?;
        }
        if let Some(v) = non_empty(section.get("inspection_concurrency")) {
            let concurrency: usize = parse_value("reaper", "inspection_concurrency", v)?;
            reaper.inspection_concurrency = concurrency.max(1);
        }
        if let Some(v) = non_empty(section.get("scratch_dir")) {
            reaper.scratch_dir = Some(expand_tilde(v));
        }
        if let Some(v) = non_empty(section.get("page_keep_minutes")) {
            reaper.page_keep_minutes = parse_value("reaper", "page_keep_minutes", v)?;
        }
        if let Some(v) = non_empty(section.get("page_interval_secs")) {
            reaper.page_interval_secs = parse_value("reaper", "page_interval_secs", v)?;
        }
    }

    if let Some(section) = ini.section(Some("browser")) {
        if let Some(v) = non_empty(section.get("executable")) {
            config.browser.executable = Some(expand_tilde(v));
        }
        if let Some(v) = non_empty(section.get("launch_timeout_secs")) {
            config.browser.launch_timeout_secs =
                parse_value("browser", "launch_timeout_secs", v)?;
        }
    }

    if let Some(section) = ini.section(Some("render")) {
        if let Some(v) = non_empty(section.get("command")) {
            config.render.command = Some(v.to_string());
        }
        if let Some(v) = non_empty(section.get("timeout_secs")) {
            config.render.timeout_secs = parse_value("render", "timeout_secs", v)?;
        }
    }

    if let Some(section) = ini.section(Some("optimize")) {
        let optimize = &mut config.optimize;
        if let Some(v) = section.get("disable_compress") {
            optimize.disable_compress = parse_bool(v);
        }
        if let Some(v) = section.get("disable_optimize") {
            optimize.disable_optimize = parse_bool(v);
        }
        if let Some(v) = section.get("disable_deep_optimize") {
            optimize.disable_deep_optimize = parse_bool(v);
        }
        if let Some(v) = non_empty(section.get("power_level")) {
            optimize.power_level = parse_value("optimize", "power_level", v)?;
        }
        if let Some(v) = non_empty(section.get("environment")) {
            optimize.environment = parse_value("optimize", "environment", v)?;
        }
    }

    Ok(config)
}

/// Parse a boolean value (true/1/yes/on, case-insensitive).
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_value<T>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError>
where
    T: FromStr,
    T::Err: ToString,
{
    value
        .parse()
        .map_err(|e: T::Err| invalid(section, key, value, &e.to_string()))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

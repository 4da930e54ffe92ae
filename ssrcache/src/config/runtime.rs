//! Conversions from file settings into the runtime types of each component.

use std::time::Duration;

use super::settings::ConfigFile;
use crate::gateway::MaintenanceMode;
use crate::pool::PoolConfig;
use crate::reaper::{
    ArtifactSchedule, CheckOptions, ChromeInspector, PageSchedule, SessionSchedule,
    SessionSweepOptions,
};
use crate::time::minutes;
use crate::transform::TransformConfig;
use crate::worker::ExternalRenderer;

impl ConfigFile {
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(self.workers.max_workers)
    }

    pub fn transform_config(&self) -> TransformConfig {
        self.optimize
    }

    pub fn maintenance_mode(&self) -> MaintenanceMode {
        if self.cache.maintenance {
            MaintenanceMode::enabled(&self.cache.maintenance_page)
        } else {
            MaintenanceMode::disabled()
        }
    }

    /// Artifact check window. `valid_request_ms` overrides the half-schedule
    /// default.
    pub fn check_options(&self) -> CheckOptions {
        let options = CheckOptions::with_schedule(Duration::from_millis(self.reaper.schedule_ms));
        match self.reaper.valid_request_ms {
            Some(ms) => options.with_valid_request_at(Duration::from_millis(ms)),
            None => options,
        }
    }

    pub fn session_options(&self) -> SessionSweepOptions {
        SessionSweepOptions {
            keep: minutes(self.reaper.session_keep_minutes),
            in_use: self.reaper.session_in_use.clone(),
            concurrency: self.reaper.inspection_concurrency.max(1),
        }
    }

    pub fn artifact_schedule(&self) -> ArtifactSchedule {
        let schedule =
            ArtifactSchedule::new(&self.cache.directory).with_options(self.check_options());
        match self.reaper.artifact_interval_secs {
            Some(secs) => schedule.with_interval(Duration::from_secs(secs)),
            None => schedule,
        }
    }

    /// None when no session directory is configured.
    pub fn session_schedule(&self) -> Option<SessionSchedule> {
        let dir = self.reaper.session_dir.as_ref()?;
        Some(
            SessionSchedule::new(dir)
                .with_options(self.session_options())
                .with_interval(Duration::from_secs(self.reaper.session_interval_secs)),
        )
    }

    /// None when no scratch directory is configured.
    pub fn page_schedule(&self) -> Option<PageSchedule> {
        let dir = self.reaper.scratch_dir.as_ref()?;
        Some(
            PageSchedule::new(dir)
                .with_keep(minutes(self.reaper.page_keep_minutes))
                .with_interval(Duration::from_secs(self.reaper.page_interval_secs)),
        )
    }

    pub fn inspector(&self) -> ChromeInspector {
        ChromeInspector::new(self.browser.executable.clone())
            .with_launch_timeout(Duration::from_secs(self.browser.launch_timeout_secs))
    }

    /// None when no render command is configured.
    pub fn renderer(&self) -> Option<ExternalRenderer> {
        let command = self.render.command.as_deref()?;
        ExternalRenderer::from_template(command)
            .map(|r| r.with_timeout(Duration::from_secs(self.render.timeout_secs)))
    }
}

//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and construction of
//! the store, pool and gateway so command handlers stay short.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::CliError;
use ssrcache::artifact::ArtifactStore;
use ssrcache::config::{config_directory, config_file_path, ConfigFile};
use ssrcache::gateway::CacheGateway;
use ssrcache::logging::{init_console_logging, init_logging, LoggingGuard, DEFAULT_LOG_DIR, DEFAULT_LOG_FILE};
use ssrcache::pool::{BoxFuture, TaskPool, WorkerError};
use ssrcache::transform::HtmlTransformer;
use ssrcache::worker::{ExternalRenderer, PageWorker, Renderer};

/// Global flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct RunnerOptions {
    pub config_path: Option<PathBuf>,
    pub debug: bool,
}

impl RunnerOptions {
    pub fn config_path(&self) -> PathBuf {
        self.config_path.clone().unwrap_or_else(config_file_path)
    }
}

/// Renderer used by the CLI: the configured command, or a stand-in that
/// reports the missing setting on every render.
pub enum CliRenderer {
    External(ExternalRenderer),
    Unconfigured,
}

impl Renderer for CliRenderer {
    fn render<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, WorkerError>> {
        match self {
            CliRenderer::External(renderer) => renderer.render(url),
            CliRenderer::Unconfigured => Box::pin(async move {
                Err(WorkerError::render(
                    url,
                    "no render command configured ([render] command)",
                ))
            }),
        }
    }
}

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps file logging active while runner exists
    _logging_guard: Option<LoggingGuard>,
    config: ConfigFile,
}

impl CliRunner {
    /// Runner for one-shot commands: stderr logging only.
    pub fn new(options: &RunnerOptions) -> Result<Self, CliError> {
        init_console_logging(options.debug);
        let config = Self::load_config(options)?;
        Ok(Self {
            _logging_guard: None,
            config,
        })
    }

    /// Runner for the daemon: a log file under `~/.ssrcache/logs` plus stdout.
    pub fn for_daemon(options: &RunnerOptions) -> Result<Self, CliError> {
        let log_dir = config_directory().join(DEFAULT_LOG_DIR);
        let guard = init_logging(&log_dir, DEFAULT_LOG_FILE, options.debug)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;
        let config = Self::load_config(options)?;
        Ok(Self {
            _logging_guard: Some(guard),
            config,
        })
    }

    fn load_config(options: &RunnerOptions) -> Result<ConfigFile, CliError> {
        let mut config = ConfigFile::load_from(&options.config_path())?;
        config.apply_env();
        Ok(config)
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!(version = ssrcache::VERSION, command, "ssrcache starting");
        info!(
            dir = %self.config.cache.directory.display(),
            max_workers = self.config.workers.max_workers,
            maintenance = self.config.cache.maintenance,
            "Cache configuration"
        );
    }

    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.config.cache.directory)
    }

    /// Pool backed by a [`PageWorker`] over the configured store.
    pub fn pool(&self) -> TaskPool {
        let renderer = match self.config.renderer() {
            Some(renderer) => CliRenderer::External(renderer),
            None => {
                warn!("No render command configured; cache misses cannot be rendered");
                CliRenderer::Unconfigured
            }
        };
        let transformer = HtmlTransformer::new(self.config.transform_config());
        let worker = PageWorker::new(self.store(), renderer, transformer);
        TaskPool::new(worker, self.config.pool_config())
    }

    pub fn gateway(&self) -> CacheGateway {
        CacheGateway::new(self.store(), self.pool())
            .with_maintenance(self.config.maintenance_mode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_renderer_reports_setting() {
        let err = CliRenderer::Unconfigured
            .render("https://a.test/")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("[render] command"));
    }

    #[test]
    fn test_config_path_override() {
        let options = RunnerOptions {
            config_path: Some(PathBuf::from("/tmp/custom.ini")),
            debug: false,
        };
        assert_eq!(options.config_path(), PathBuf::from("/tmp/custom.ini"));
        assert_eq!(RunnerOptions::default().config_path(), config_file_path());
    }
}

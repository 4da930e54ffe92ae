//! Source of rendered HTML.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::pool::{BoxFuture, WorkerError};

/// Placeholder substituted with the page URL in a render command.
pub const URL_PLACEHOLDER: &str = "{url}";

/// Default time a render may take before it is abandoned.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Produces HTML for a URL.
///
/// This is where a headless browser lives; the cache layer only consumes
/// its output.
pub trait Renderer: Send + Sync + 'static {
    fn render<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, WorkerError>>;
}

/// Renders by running an external command and capturing its stdout.
///
/// The template is split on whitespace; `{url}` may appear anywhere in any
/// argument. No shell is involved, so the URL is never interpreted.
#[derive(Debug, Clone)]
pub struct ExternalRenderer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalRenderer {
    /// Parses a command template such as `node render.js --url {url}`.
    ///
    /// Returns `None` for an empty template.
    pub fn from_template(template: &str) -> Option<Self> {
        let mut parts = template.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            timeout: DEFAULT_RENDER_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with `url` substituted.
    pub fn args_for(&self, url: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(URL_PLACEHOLDER, url))
            .collect()
    }

    async fn run(&self, url: &str) -> Result<String, WorkerError> {
        let args = self.args_for(url);
        debug!(program = %self.program, ?args, "Spawning renderer");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| WorkerError::render(url, format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| WorkerError::render(url, format!("failed to spawn {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WorkerError::render(
                url,
                format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            ));
        }

        let html = String::from_utf8(output.stdout)
            .map_err(|_| WorkerError::render(url, "renderer output is not utf-8"))?;
        if html.trim().is_empty() {
            return Err(WorkerError::render(url, "renderer produced no output"));
        }
        Ok(html)
    }
}

impl Renderer for ExternalRenderer {
    fn render<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, WorkerError>> {
        Box::pin(self.run(url))
    }
}

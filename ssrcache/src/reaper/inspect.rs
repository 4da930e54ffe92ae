//! Active-use verification for browser session directories.
//!
//! A session directory may still be held by a running browser. Age alone is
//! not enough to delete it, so the reaper opens the profile in a throwaway
//! headless browser and counts the pages it restores. One page is the
//! default blank tab; more means the profile is in use.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::pool::BoxFuture;

/// Binary names searched on `PATH`, in preference order.
pub const BROWSER_NAMES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

/// Default time allowed for the browser to expose its DevTools endpoint.
pub const DEFAULT_LAUNCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Resolved once per process, on first use.
static EXECUTABLE: OnceCell<Option<PathBuf>> = OnceCell::const_new();

/// Errors from a session inspection.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("No browser executable found (searched PATH for {names:?})")]
    ExecutableNotFound { names: &'static [&'static str] },

    #[error("Failed to launch browser {}: {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Browser did not expose a DevTools endpoint within {0:?}")]
    Timeout(Duration),

    #[error("Browser exited without exposing a DevTools endpoint")]
    NoDevToolsEndpoint,

    #[error("Failed to read browser output: {0}")]
    Io(#[from] std::io::Error),

    #[error("DevTools request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Counts the open pages of a browser session.
pub trait SessionInspector: Send + Sync {
    /// Number of pages open in `session_dir`. Read fresh on every call.
    fn open_page_count<'a>(
        &'a self,
        session_dir: &'a Path,
    ) -> BoxFuture<'a, Result<usize, InspectError>>;
}

/// Returns the browser executable found on `PATH`, searching only once per
/// process.
pub async fn resolve_executable() -> Option<&'static PathBuf> {
    EXECUTABLE
        .get_or_init(|| async {
            let found = tokio::task::spawn_blocking(|| {
                std::env::var_os("PATH").and_then(|path| find_in_path(&path, BROWSER_NAMES))
            })
            .await
            .ok()
            .flatten();
            match &found {
                Some(path) => info!(path = %path.display(), "Resolved browser executable"),
                None => info!("No browser executable on PATH"),
            }
            found
        })
        .await
        .as_ref()
}

/// First existing file named one of `names` in the directories of `path_var`.
pub fn find_in_path(path_var: &OsStr, names: &[&str]) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

/// Extracts the port from Chrome's `DevTools listening on ws://host:port/...`
/// stderr line.
pub fn parse_devtools_port(line: &str) -> Option<u16> {
    let rest = line.split("DevTools listening on ws://").nth(1)?;
    let authority = rest.split('/').next()?;
    authority.rsplit(':').next()?.parse().ok()
}

#[derive(Debug, Deserialize)]
struct DevToolsTarget {
    #[serde(rename = "type")]
    kind: String,
}

/// Inspects sessions by launching a headless Chromium-family browser.
#[derive(Debug, Clone)]
pub struct ChromeInspector {
    executable: Option<PathBuf>,
    launch_timeout: Duration,
    client: reqwest::Client,
}

impl ChromeInspector {
    /// `executable` overrides the `PATH` search.
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self {
            executable,
            launch_timeout: DEFAULT_LAUNCH_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_launch_timeout(mut self, timeout: Duration) -> Self {
        self.launch_timeout = timeout;
        self
    }

    async fn executable(&self) -> Result<PathBuf, InspectError> {
        if let Some(path) = &self.executable {
            return Ok(path.clone());
        }
        resolve_executable()
            .await
            .cloned()
            .ok_or(InspectError::ExecutableNotFound {
                names: BROWSER_NAMES,
            })
    }

    async fn inspect(&self, session_dir: &Path) -> Result<usize, InspectError> {
        let executable = self.executable().await?;
        debug!(executable = %executable.display(), dir = %session_dir.display(), "Launching inspection browser");

        let mut child = Command::new(&executable)
            .arg("--headless=new")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg(format!("--user-data-dir={}", session_dir.display()))
            .arg("--remote-debugging-port=0")
            .arg("about:blank")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| InspectError::Launch {
                path: executable.clone(),
                source,
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or(InspectError::NoDevToolsEndpoint)?;

        let result = async {
            let port = tokio::time::timeout(self.launch_timeout, read_devtools_port(stderr))
                .await
                .map_err(|_| InspectError::Timeout(self.launch_timeout))??;
            self.count_pages(port).await
        }
        .await;

        // The browser is ours; close it whatever the outcome.
        let _ = child.kill().await;
        result
    }

    async fn count_pages(&self, port: u16) -> Result<usize, InspectError> {
        let targets: Vec<DevToolsTarget> = self
            .client
            .get(format!("http://127.0.0.1:{port}/json/list"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(targets.iter().filter(|t| t.kind == "page").count())
    }
}

impl Default for ChromeInspector {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SessionInspector for ChromeInspector {
    fn open_page_count<'a>(
        &'a self,
        session_dir: &'a Path,
    ) -> BoxFuture<'a, Result<usize, InspectError>> {
        Box::pin(self.inspect(session_dir))
    }
}

async fn read_devtools_port<R>(stderr: R) -> Result<u16, InspectError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stderr).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(port) = parse_devtools_port(&line) {
            return Ok(port);
        }
    }
    Err(InspectError::NoDevToolsEndpoint)
}

//! Degraded-mode responses served while the cache is switched off.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::artifact::STATUS_OK;

/// Status when the caller supplied no content.
pub const STATUS_UNAVAILABLE: u16 = 503;

/// Global maintenance switch plus the static page served under it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceMode {
    pub enabled: bool,
    pub page: PathBuf,
}

impl MaintenanceMode {
    pub fn enabled(page: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            page: page.into(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }
}

/// The static document returned instead of touching disk or workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceDocument {
    /// Static page to serve.
    pub page: PathBuf,
    pub status: u16,
    /// Caller-supplied content, echoed back on publish.
    pub html: Option<String>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub requested_at: SystemTime,
    pub available: bool,
    pub is_init: bool,
}

impl MaintenanceDocument {
    /// Builds the document. Status is 200 when `html` is non-empty, 503
    /// otherwise.
    pub fn new(page: &Path, html: Option<String>) -> Self {
        let html = html.filter(|h| !h.is_empty());
        let now = SystemTime::now();
        Self {
            page: page.to_path_buf(),
            status: if html.is_some() {
                STATUS_OK
            } else {
                STATUS_UNAVAILABLE
            },
            html,
            created_at: now,
            updated_at: now,
            requested_at: now,
            available: false,
            is_init: true,
        }
    }
}

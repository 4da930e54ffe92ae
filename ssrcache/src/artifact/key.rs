//! Cache key derivation.

use sha2::{Digest, Sha256};
use std::fmt;

/// Digest of a normalized URL, used as the artifact file stem.
///
/// Keys are plain SHA-256 hex so they are stable across restarts and safe as
/// file names on every platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for a URL.
    ///
    /// # Example
    ///
    /// ```
    /// use ssrcache::artifact::CacheKey;
    ///
    /// let a = CacheKey::from_url("https://example.com/docs#intro");
    /// let b = CacheKey::from_url("  https://example.com/docs ");
    /// assert_eq!(a, b);
    /// assert_eq!(a.as_str().len(), 64);
    /// ```
    pub fn from_url(url: &str) -> Self {
        let normalized = normalize_url(url);
        let digest = Sha256::digest(normalized.as_bytes());
        Self(hex::encode(digest))
    }

    /// Wraps an already-derived key, e.g. one parsed back from a file name.
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trims whitespace and drops the fragment, which never reaches the server.
fn normalize_url(url: &str) -> &str {
    let trimmed = url.trim();
    match trimmed.find('#') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    }
}

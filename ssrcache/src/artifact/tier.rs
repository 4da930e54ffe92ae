//! Artifact tiers and their file-name suffixes.

use std::fmt;
use std::path::{Path, PathBuf};

/// Suffix shared by every artifact file (brotli payload).
const COMPRESSED_SUFFIX: &str = ".br";

/// Marker inserted before [`COMPRESSED_SUFFIX`] for the Renewing tier.
const RENEW_MARKER: &str = ".renew";

/// Marker inserted before [`COMPRESSED_SUFFIX`] for the Raw tier.
const RAW_MARKER: &str = ".raw";

/// Which copy of a page an artifact file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactTier {
    /// Optimized, current output.
    Fresh,
    /// Previous Fresh content, served while a re-render is in flight.
    Renewing,
    /// Unoptimized output published straight from the renderer.
    Raw,
}

impl ArtifactTier {
    /// Tiers in serve priority order.
    pub const SERVE_ORDER: [ArtifactTier; 3] =
        [ArtifactTier::Fresh, ArtifactTier::Renewing, ArtifactTier::Raw];

    /// Marker between the key and [`COMPRESSED_SUFFIX`].
    fn marker(self) -> &'static str {
        match self {
            Self::Fresh => "",
            Self::Renewing => RENEW_MARKER,
            Self::Raw => RAW_MARKER,
        }
    }

    /// File name for `key` at this tier.
    pub fn file_name(self, key: &str) -> String {
        format!("{key}{}{COMPRESSED_SUFFIX}", self.marker())
    }

    /// Returns true for the unoptimized tier.
    pub fn is_raw(self) -> bool {
        self == Self::Raw
    }
}

impl fmt::Display for ArtifactTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fresh => write!(f, "fresh"),
            Self::Renewing => write!(f, "renewing"),
            Self::Raw => write!(f, "raw"),
        }
    }
}

/// Splits an artifact file name into its key and tier.
///
/// Returns `None` for names that are not artifact files (temp files,
/// unrelated scratch data).
///
/// ```
/// use ssrcache::artifact::{parse_artifact_name, ArtifactTier};
///
/// assert_eq!(parse_artifact_name("k1.raw.br"), Some(("k1", ArtifactTier::Raw)));
/// assert_eq!(parse_artifact_name("k1.br"), Some(("k1", ArtifactTier::Fresh)));
/// assert_eq!(parse_artifact_name("k1.tmp"), None);
/// ```
pub fn parse_artifact_name(name: &str) -> Option<(&str, ArtifactTier)> {
    let stem = name.strip_suffix(COMPRESSED_SUFFIX)?;
    let (key, tier) = if let Some(key) = stem.strip_suffix(RENEW_MARKER) {
        (key, ArtifactTier::Renewing)
    } else if let Some(key) = stem.strip_suffix(RAW_MARKER) {
        (key, ArtifactTier::Raw)
    } else {
        (stem, ArtifactTier::Fresh)
    };

    if key.is_empty() || key.contains('.') {
        return None;
    }
    Some((key, tier))
}

/// Returns the sibling path on the other side of the Raw marker.
///
/// A Raw path maps to its Fresh counterpart and any other path maps to its
/// Raw counterpart. Paths that are not artifact files map to `None`.
pub fn raw_variant(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let (key, tier) = parse_artifact_name(name)?;
    let sibling = match tier {
        ArtifactTier::Raw => ArtifactTier::Fresh,
        ArtifactTier::Fresh | ArtifactTier::Renewing => ArtifactTier::Raw,
    };
    Some(path.with_file_name(sibling.file_name(key)))
}

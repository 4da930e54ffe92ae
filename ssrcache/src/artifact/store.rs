//! Read side of the tiered cache protocol.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use filetime::FileTime;
use tracing::{debug, warn};

use super::info::FileInfo;
use super::key::CacheKey;
use super::tier::ArtifactTier;
use crate::error::SsrCacheError;

/// HTTP-style status carried by a servable descriptor.
pub const STATUS_OK: u16 = 200;

/// A servable artifact selected by [`ArtifactStore::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub key: CacheKey,
    pub tier: ArtifactTier,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub status: u16,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    /// Time of this request. Computed by `resolve`, persisted only when the
    /// caller passes the descriptor to [`ArtifactStore::record_request`].
    pub requested_at: SystemTime,
    pub available: bool,
    pub is_init: bool,
}

impl ArtifactDescriptor {
    /// True when the served copy is the unoptimized Raw tier.
    pub fn is_raw(&self) -> bool {
        self.tier.is_raw()
    }
}

/// The per-deployment pages directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at `dir`. The directory is not created here.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file for `key` at `tier`, whether or not it exists.
    pub fn tier_path(&self, key: &CacheKey, tier: ArtifactTier) -> PathBuf {
        self.dir.join(tier.file_name(key.as_str()))
    }

    /// Selects the artifact to serve for `key`.
    ///
    /// Tiers are probed synchronously in serve order. A tier whose file is
    /// missing is skipped; a tier whose file cannot be stat'ed or holds zero
    /// bytes is logged as corrupt and skipped, so it is never served. `None`
    /// means miss.
    ///
    /// This never writes: `requested_at` is set to now on the returned
    /// descriptor but not persisted.
    pub fn resolve(&self, key: &CacheKey) -> Option<ArtifactDescriptor> {
        for tier in ArtifactTier::SERVE_ORDER {
            let path = self.tier_path(key, tier);
            if !path.exists() {
                continue;
            }

            match Self::servable_info(&path) {
                Ok(info) => return Some(Self::descriptor(key, tier, path, info)),
                Err(SsrCacheError::CorruptArtifact(path)) => {
                    warn!(path = %path.display(), %tier, "Skipping zero-byte artifact");
                }
                Err(e) => {
                    warn!(error = %e, %tier, "Skipping unreadable artifact");
                }
            }
        }

        debug!(%key, "Artifact miss");
        None
    }

    /// Lists the tier files that currently exist for `key`, in serve order.
    pub fn existing_tiers(&self, key: &CacheKey) -> Vec<(ArtifactTier, PathBuf)> {
        ArtifactTier::SERVE_ORDER
            .into_iter()
            .map(|tier| (tier, self.tier_path(key, tier)))
            .filter(|(_, path)| path.exists())
            .collect()
    }

    /// Persists the descriptor's `requested_at` as the file's access time.
    ///
    /// The reaper reads it back when computing idleness.
    pub fn record_request(&self, descriptor: &ArtifactDescriptor) -> Result<(), SsrCacheError> {
        filetime::set_file_atime(
            &descriptor.path,
            FileTime::from_system_time(descriptor.requested_at),
        )
        .map_err(|e| SsrCacheError::io(&descriptor.path, e))
    }

    fn servable_info(path: &Path) -> Result<FileInfo, SsrCacheError> {
        let info = FileInfo::read(path)?;
        if info.size == 0 {
            return Err(SsrCacheError::CorruptArtifact(path.to_path_buf()));
        }
        Ok(info)
    }

    fn descriptor(
        key: &CacheKey,
        tier: ArtifactTier,
        path: PathBuf,
        info: FileInfo,
    ) -> ArtifactDescriptor {
        ArtifactDescriptor {
            key: key.clone(),
            tier,
            path,
            size_bytes: info.size,
            status: STATUS_OK,
            created_at: info.created_at,
            updated_at: info.updated_at,
            requested_at: SystemTime::now(),
            available: true,
            is_init: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ArtifactStore, CacheKey) {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path());
        (temp, store, CacheKey::from_raw("k1"))
    }

    fn write_tier(store: &ArtifactStore, key: &CacheKey, tier: ArtifactTier, bytes: usize) {
        std::fs::write(store.tier_path(key, tier), vec![b'x'; bytes]).unwrap();
    }

    #[test]
    fn test_miss_when_nothing_on_disk() {
        let (_temp, store, key) = setup();
        assert!(store.resolve(&key).is_none());
    }

    #[test]
    fn test_raw_only_is_served_as_raw() {
        let (_temp, store, key) = setup();
        write_tier(&store, &key, ArtifactTier::Raw, 10);

        let desc = store.resolve(&key).unwrap();
        assert!(desc.is_raw());
        assert!(desc.available);
        assert!(!desc.is_init);
        assert_eq!(desc.size_bytes, 10);
        assert_eq!(desc.path, store.tier_path(&key, ArtifactTier::Raw));
    }

    #[test]
    fn test_renewing_beats_raw() {
        let (_temp, store, key) = setup();
        write_tier(&store, &key, ArtifactTier::Raw, 10);
        write_tier(&store, &key, ArtifactTier::Renewing, 20);

        let desc = store.resolve(&key).unwrap();
        assert_eq!(desc.tier, ArtifactTier::Renewing);
        assert!(!desc.is_raw());
    }

    #[test]
    fn test_fresh_beats_everything() {
        let (_temp, store, key) = setup();
        for tier in ArtifactTier::SERVE_ORDER {
            write_tier(&store, &key, tier, 5);
        }

        let desc = store.resolve(&key).unwrap();
        assert_eq!(desc.tier, ArtifactTier::Fresh);
        assert_eq!(desc.status, STATUS_OK);
    }

    #[test]
    fn test_zero_byte_only_tier_is_miss() {
        let (_temp, store, key) = setup();
        write_tier(&store, &key, ArtifactTier::Raw, 0);

        assert!(store.resolve(&key).is_none());
    }

    #[test]
    fn test_zero_byte_fresh_falls_through_to_renewing() {
        let (_temp, store, key) = setup();
        write_tier(&store, &key, ArtifactTier::Fresh, 0);
        write_tier(&store, &key, ArtifactTier::Renewing, 12);

        let desc = store.resolve(&key).unwrap();
        assert_eq!(desc.tier, ArtifactTier::Renewing);
        assert_eq!(desc.size_bytes, 12);
    }

    #[test]
    fn test_resolve_does_not_touch_file() {
        let (_temp, store, key) = setup();
        write_tier(&store, &key, ArtifactTier::Fresh, 4);
        let path = store.tier_path(&key, ArtifactTier::Fresh);
        let old = SystemTime::now() - Duration::from_secs(3600);
        filetime::set_file_times(
            &path,
            FileTime::from_system_time(old),
            FileTime::from_system_time(old),
        )
        .unwrap();

        let desc = store.resolve(&key).unwrap();
        let info = FileInfo::read(&path).unwrap();

        assert!(desc.requested_at > old + Duration::from_secs(3000));
        assert!(info.requested_at < old + Duration::from_secs(10));
    }

    #[test]
    fn test_record_request_persists_access_time() {
        let (_temp, store, key) = setup();
        write_tier(&store, &key, ArtifactTier::Fresh, 4);
        let path = store.tier_path(&key, ArtifactTier::Fresh);
        let old = SystemTime::now() - Duration::from_secs(3600);
        filetime::set_file_times(
            &path,
            FileTime::from_system_time(old),
            FileTime::from_system_time(old),
        )
        .unwrap();

        let desc = store.resolve(&key).unwrap();
        store.record_request(&desc).unwrap();

        let info = FileInfo::read(&path).unwrap();
        assert!(info.requested_at > old + Duration::from_secs(3000));
    }

    #[test]
    fn test_existing_tiers_in_serve_order() {
        let (_temp, store, key) = setup();
        write_tier(&store, &key, ArtifactTier::Raw, 1);
        write_tier(&store, &key, ArtifactTier::Fresh, 1);

        let tiers: Vec<_> = store
            .existing_tiers(&key)
            .into_iter()
            .map(|(tier, _)| tier)
            .collect();
        assert_eq!(tiers, vec![ArtifactTier::Fresh, ArtifactTier::Raw]);
    }
}

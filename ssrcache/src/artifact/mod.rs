//! Tiered on-disk artifact store.
//!
//! Each URL's rendered output lives in a single directory as up to three
//! brotli-compressed files, one per [`ArtifactTier`]:
//!
//! ```text
//! <pages_dir>/<key>.br        Fresh     optimized, current
//! <pages_dir>/<key>.renew.br  Renewing  previous Fresh, kept while re-rendering
//! <pages_dir>/<key>.raw.br    Raw       unoptimized, published straight from render
//! ```
//!
//! Serve priority is strictly Fresh > Renewing > Raw > miss, and a zero-byte
//! file is never served.

mod info;
mod key;
mod store;
mod tier;

pub use info::FileInfo;
pub use key::CacheKey;
pub use store::{ArtifactDescriptor, ArtifactStore, STATUS_OK};
pub use tier::{parse_artifact_name, raw_variant, ArtifactTier};

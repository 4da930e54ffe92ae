//! ssrcache - on-disk cache layer for server-side rendered pages
//!
//! Rendered pages are stored as brotli-compressed tier files, written by
//! render workers that run behind one bounded pool, and reclaimed by a
//! reaper that sweeps idle artifacts, stale browser sessions and scratch
//! pages.
//!
//! # High-Level API
//!
//! ```ignore
//! use ssrcache::artifact::ArtifactStore;
//! use ssrcache::gateway::CacheGateway;
//! use ssrcache::pool::{PoolConfig, TaskPool};
//! use ssrcache::transform::HtmlTransformer;
//! use ssrcache::worker::{ExternalRenderer, PageWorker};
//!
//! let store = ArtifactStore::new("/var/cache/ssr");
//! let renderer = ExternalRenderer::from_template("prerender {url}").unwrap();
//! let worker = PageWorker::new(store.clone(), renderer, HtmlTransformer::default());
//! let gateway = CacheGateway::new(store, TaskPool::new(worker, PoolConfig::default()));
//!
//! // Served from the cache, or rendered on a miss
//! let response = gateway.fetch("https://example.com/").await;
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod pool;
pub mod reaper;
pub mod time;
pub mod transform;
pub mod worker;

pub use error::SsrCacheError;

/// Version of the ssrcache library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`cache`] - Gateway operations (achieve, fetch, publish, revalidate, evict)
//! - [`config`] - Configuration management (init, path, show)
//! - [`reaper`] - Reaper daemon, artifact check and one-shot sweeps
//! - [`transform`] - HTML transform pipeline on a file

pub mod cache;
pub mod config;
pub mod output;
pub mod reaper;
pub mod transform;

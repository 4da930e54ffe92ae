//! Isolated task execution for every heavy operation.
//!
//! Rendering, tier writes, and session-directory deletion all go through a
//! [`TaskPool`]. The pool is a single shared arena of worker slots with a FIFO
//! wait queue in front of it:
//!
//! ```text
//!   caller ──► run(task) ──► acquire slot (queue) ──► spawn ──► RenderWorker::execute
//!                 ▲                                              │
//!                 └──────── Some(output) / None (logged) ◄───────┘
//! ```
//!
//! Each task runs on its own spawned tokio task, so a worker error or panic is
//! contained to that one call and surfaces as `None`. The slot travels with
//! the spawned task and is released however the task ends.

mod gateway;
mod task;
mod worker;

pub use gateway::{PoolConfig, PoolError, PoolStats, TaskPool, DEFAULT_MAX_WORKERS, MAX_WORKERS_ENV};
pub use task::{PublishParams, TaskOperation, TaskOutput, TaskPayload, WorkerTask, WriteAck};
pub use worker::{BoxFuture, RenderWorker, WorkerError};

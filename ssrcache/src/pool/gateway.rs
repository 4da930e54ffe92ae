//! Shared, bounded worker pool.

use std::any::Any;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, warn};

use super::task::{TaskOutput, WorkerTask};
use super::worker::{RenderWorker, WorkerError};

/// Default number of worker slots.
pub const DEFAULT_MAX_WORKERS: usize = 7;

/// Environment variable overriding the worker slot count.
pub const MAX_WORKERS_ENV: &str = "MAX_WORKERS";

/// Pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_workers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl PoolConfig {
    /// Creates a config with `max_workers` slots (at least one).
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    /// Reads [`MAX_WORKERS_ENV`], falling back to the default.
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(MAX_WORKERS_ENV).ok().as_deref())
    }

    /// Parses an override value. Unparseable values are ignored with a warning.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::default(),
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) => Self::new(n),
                Err(_) => {
                    warn!(value = raw, "Ignoring invalid {}", MAX_WORKERS_ENV);
                    Self::default()
                }
            },
        }
    }
}

/// Faults raised while dispatching a task.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker failed: {0}")]
    Worker(#[from] WorkerError),

    #[error("worker panicked: {0}")]
    Panicked(String),

    #[error("worker task aborted: {0}")]
    Aborted(String),

    #[error("task pool is shut down")]
    ShutDown,
}

/// Point-in-time view of pool usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub available: usize,
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub completed: u64,
    pub faulted: u64,
}

#[derive(Debug, Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    completed: AtomicU64,
    faulted: AtomicU64,
}

impl Counters {
    fn update_peak(&self, current: usize) {
        let mut peak = self.peak_in_flight.load(Ordering::Relaxed);
        while current > peak {
            match self.peak_in_flight.compare_exchange_weak(
                peak,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(p) => peak = p,
            }
        }
    }
}

/// An occupied worker slot. Releases the permit and the in-flight count on
/// drop, including when the owning task panics or is abandoned.
struct WorkerSlot {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Counters>,
}

impl WorkerSlot {
    fn occupy(permit: OwnedSemaphorePermit, counters: Arc<Counters>) -> Self {
        let current = counters.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        counters.update_peak(current);
        Self {
            _permit: permit,
            counters,
        }
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Gateway through which every heavy operation runs.
///
/// Cloning is cheap; clones share the same slots and worker.
#[derive(Clone)]
pub struct TaskPool {
    worker: Arc<dyn RenderWorker>,
    slots: Arc<Semaphore>,
    capacity: usize,
    counters: Arc<Counters>,
}

impl TaskPool {
    /// Creates a pool that runs tasks on `worker`.
    pub fn new(worker: impl RenderWorker, config: PoolConfig) -> Self {
        Self::with_shared_worker(Arc::new(worker), config)
    }

    /// Creates a pool around an already shared worker.
    pub fn with_shared_worker(worker: Arc<dyn RenderWorker>, config: PoolConfig) -> Self {
        let capacity = config.max_workers.max(1);
        Self {
            worker,
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Runs `task` and returns its output, or `None` if it faulted.
    ///
    /// Faults are logged here and never propagated.
    pub async fn run(&self, task: WorkerTask) -> Option<TaskOutput> {
        let operation = task.operation();
        match self.dispatch(task).await {
            Ok(output) => Some(output),
            Err(e) => {
                error!(%operation, error = %e, "Worker task failed");
                None
            }
        }
    }

    /// Runs `task` and returns the raw outcome.
    ///
    /// Waits for a free slot, then executes the task on its own tokio task.
    /// Abandoning the returned future does not cancel the task.
    pub async fn dispatch(&self, task: WorkerTask) -> Result<TaskOutput, PoolError> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::ShutDown)?;
        let slot = WorkerSlot::occupy(permit, Arc::clone(&self.counters));

        let operation = task.operation();
        let worker = Arc::clone(&self.worker);
        debug!(%operation, "Dispatching worker task");

        let handle = tokio::spawn(async move {
            let _slot = slot;
            worker.execute(task).await
        });

        let result = match handle.await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(PoolError::Worker(e)),
            Err(e) if e.is_panic() => Err(PoolError::Panicked(panic_message(e.into_panic()))),
            Err(e) => Err(PoolError::Aborted(e.to_string())),
        };

        let counter = if result.is_ok() {
            &self.counters.completed
        } else {
            &self.counters.faulted
        };
        counter.fetch_add(1, Ordering::Relaxed);

        result
    }

    /// Stops accepting work. Queued and later dispatches resolve to
    /// [`PoolError::ShutDown`]; tasks already running finish normally.
    pub fn shutdown(&self) {
        self.slots.close();
    }

    /// Returns true once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.slots.is_closed()
    }

    /// Current usage snapshot.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity,
            available: self.slots.available_permits(),
            in_flight: self.counters.in_flight.load(Ordering::Relaxed),
            peak_in_flight: self.counters.peak_in_flight.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            faulted: self.counters.faulted.load(Ordering::Relaxed),
        }
    }

    /// Number of worker slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

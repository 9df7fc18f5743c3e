//! Error types for pool operations.

use thiserror::Error;

/// Errors returned synchronously by [`ThreadPool`](crate::ThreadPool) entry
/// points.
///
/// Failures that occur *during* work execution are never surfaced here; they
/// are routed to the pool's error handler instead.
#[derive(Debug, Error)]
pub enum PoolError {
    /// `submit` was called before `start` or after `stop`.
    #[error("pool `{0}` is not running")]
    NotRunning(String),
    /// `start` was called on a pool that already left the NEW state.
    #[error("pool `{0}` has already been started")]
    AlreadyRunning(String),
    /// Accepting the task would exceed `max_tasks_per_worker * worker_count`.
    #[error("pool `{pool}` is full: {in_flight} tasks in flight, capacity {capacity}")]
    TaskCountFull {
        /// Pool name.
        pool: String,
        /// In-flight count observed at submission, including this task.
        in_flight: usize,
        /// Configured admission capacity.
        capacity: usize,
    },
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

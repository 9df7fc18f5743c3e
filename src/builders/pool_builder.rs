//! Fluent construction of thread pools.

use std::sync::Arc;
use std::time::Duration;

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::pool::{ErrorReport, PoolEvent, ThreadPool};

/// Builder for a [`ThreadPool`].
///
/// Starts from [`PoolConfig::default`] and layers overrides plus optional
/// error and event handlers on top.
///
/// # Examples
///
/// ```
/// use workshard::builders::ThreadPoolBuilder;
/// use std::time::Duration;
///
/// let pool = ThreadPoolBuilder::named("ingest")
///     .with_worker_count(4)
///     .with_max_tasks_per_worker(8)
///     .with_max_idle(Duration::from_millis(500))
///     .on_event(|event| {
///         eprintln!("worker {} -> {:?}", event.worker_index, event.signal);
///     })
///     .build()
///     .unwrap();
/// assert_eq!(pool.worker_count(), 4);
/// ```
#[derive(Default)]
pub struct ThreadPoolBuilder {
    config: PoolConfig,
    on_error: Option<crate::pool::ErrorHandler>,
    on_event: Option<crate::pool::EventHandler>,
}

impl ThreadPoolBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the default configuration with the given pool name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        let mut builder = Self::default();
        builder.config.name = name.into();
        builder
    }

    /// Start from an existing configuration.
    #[must_use]
    pub fn from_config(config: PoolConfig) -> Self {
        Self {
            config,
            on_error: None,
            on_event: None,
        }
    }

    /// Set the number of worker shards.
    #[must_use]
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.config.worker_count = worker_count;
        self
    }

    /// Set the per-worker admission threshold.
    #[must_use]
    pub fn with_max_tasks_per_worker(mut self, max_tasks: usize) -> Self {
        self.config.max_tasks_per_worker = max_tasks;
        self
    }

    /// Set the informational idle-worker bound.
    #[must_use]
    pub fn with_max_idle_workers(mut self, max_idle_workers: usize) -> Self {
        self.config.max_idle_workers = max_idle_workers;
        self
    }

    /// Set how long a worker blocks on an empty shard before exiting.
    #[must_use]
    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.config.max_idle_ms = u64::try_from(max_idle.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Install the error handler.
    #[must_use]
    pub fn on_error(mut self, handler: impl Fn(&ErrorReport) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// Install the lifecycle event handler.
    #[must_use]
    pub fn on_event(mut self, handler: impl Fn(&PoolEvent) + Send + Sync + 'static) -> Self {
        self.on_event = Some(Arc::new(handler));
        self
    }

    /// Validate the configuration and construct the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] when validation fails.
    pub fn build(self) -> Result<ThreadPool, PoolError> {
        ThreadPool::with_handlers(self.config, self.on_error, self.on_event)
    }
}

impl std::fmt::Debug for ThreadPoolBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPoolBuilder")
            .field("config", &self.config)
            .field("on_error", &self.on_error.is_some())
            .field("on_event", &self.on_event.is_some())
            .finish()
    }
}

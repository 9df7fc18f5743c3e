//! Sharded worker pool with observable lifecycle events.
//!
//! A [`ThreadPool`] owns one priority shard per worker index. Submission
//! picks a shard from the in-flight counter, creates the shard's worker
//! thread if none is live, and pushes the task; the worker blocks on the
//! shard's internal rendezvous with a timed poll and exits after sitting
//! idle for the configured interval. Idle-retired workers are re-created on
//! demand by the next submission to their shard.
//!
//! Lifecycle events (`Waiting`, `Picked`, `Running`, `Finished`, `Canceled`)
//! are delivered to the `on_event` callback on the worker thread; panics in
//! user tasks and admission rejections are delivered to `on_error`. Both
//! handlers must not call back into pool operations that touch the same
//! shard.
//!
//! # Examples
//!
//! ```
//! use workshard::builders::ThreadPoolBuilder;
//! use workshard::SyncPoint;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let counter = Arc::new(AtomicUsize::new(0));
//! let done = Arc::new(SyncPoint::new(1));
//! let pool = ThreadPoolBuilder::named("docs")
//!     .with_worker_count(2)
//!     .build()
//!     .unwrap();
//! pool.start().unwrap();
//!
//! let counter2 = Arc::clone(&counter);
//! let done2 = Arc::clone(&done);
//! pool.submit(move || {
//!     counter2.fetch_add(1, Ordering::SeqCst);
//!     done2.add_flag(1);
//! })
//! .unwrap();
//!
//! done.wait_flag(1);
//! pool.stop();
//! assert_eq!(counter.load(Ordering::SeqCst), 1);
//! ```

mod task;

use std::any::Any;
use std::collections::{BinaryHeap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PoolConfig;
use crate::container::ExclusiveKind;
use crate::error::PoolError;
use crate::lock::{Lockable, SharedLockable, TrackedRwLock};
use crate::queue::ConcurrentPriorityQueue;

pub use task::{TaskHandle, TaskSnapshot, TaskStatus};

use task::ThreadTask;

/// Task callables are `Send` but not `Sync`, so shards read under the
/// exclusive lock kind.
type Shard = ConcurrentPriorityQueue<ThreadTask, ExclusiveKind<BinaryHeap<ThreadTask>>>;

/// Lifecycle signal carried by a [`PoolEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolSignal {
    /// A worker is about to block on its shard.
    Waiting,
    /// A worker dequeued a task.
    Picked,
    /// The task is about to run.
    Running,
    /// The task ran to completion.
    Finished,
    /// The dequeued task had been cancelled before its run began.
    Canceled,
}

/// Event delivered to the `on_event` handler, on the worker thread.
#[derive(Debug, Clone)]
pub struct PoolEvent {
    /// What happened.
    pub signal: PoolSignal,
    /// The task involved, absent for `Waiting`.
    pub task: Option<TaskSnapshot>,
    /// Index of the worker that emitted the event.
    pub worker_index: usize,
    /// Configured worker count of the pool.
    pub worker_count: usize,
    /// Snapshot of the accepted-but-unfinished task count.
    pub waiting_tasks: usize,
}

/// Classification of an [`ErrorReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorReportKind {
    /// Submission was rejected because the pool is at capacity.
    TaskCountFull,
    /// A user task panicked while running.
    TaskError,
}

/// Report delivered to the `on_error` handler.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    /// What went wrong.
    pub kind: ErrorReportKind,
    /// Worker that observed the failure, absent for admission rejections.
    pub worker_index: Option<usize>,
    /// Snapshot of the task involved.
    pub task: Option<TaskSnapshot>,
    /// Human-readable description (panic payload for task errors).
    pub message: String,
}

/// Lifecycle state of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Constructed, never started.
    New,
    /// Accepting and executing tasks.
    Running,
    /// Stopped; submissions fail.
    Stopped,
}

/// Handler invoked with every lifecycle event.
pub type EventHandler = Arc<dyn Fn(&PoolEvent) + Send + Sync>;
/// Handler invoked with every error report.
pub type ErrorHandler = Arc<dyn Fn(&ErrorReport) + Send + Sync>;

const STATE_NEW: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPED: u8 = 2;

/// State shared between the pool façade and its worker threads.
struct PoolShared {
    config: PoolConfig,
    instance_id: Uuid,
    state: AtomicU8,
    running: AtomicBool,
    in_flight: AtomicUsize,
    next_seq: AtomicU64,
    shards: Box<[Shard]>,
    live_workers: TrackedRwLock<HashMap<usize, JoinHandle<()>>>,
    on_error: Option<ErrorHandler>,
    on_event: Option<EventHandler>,
}

impl PoolShared {
    fn capacity(&self) -> usize {
        self.config
            .max_tasks_per_worker
            .saturating_mul(self.config.worker_count)
    }

    fn emit(&self, signal: PoolSignal, task: Option<TaskSnapshot>, worker_index: usize) {
        if let Some(handler) = &self.on_event {
            handler(&PoolEvent {
                signal,
                task,
                worker_index,
                worker_count: self.config.worker_count,
                waiting_tasks: self.in_flight.load(Ordering::SeqCst),
            });
        }
    }

    fn report(&self, report: &ErrorReport) {
        if let Some(handler) = &self.on_error {
            handler(report);
        }
    }
}

/// Worker pool that shards tasks across per-worker priority queues.
///
/// Workers are created lazily on submission and exit after blocking
/// `max_idle_ms` on an empty shard; [`stop`](Self::stop) joins every live
/// worker before returning, so no worker thread outlives its pool's
/// shutdown. The pool is move-only.
///
/// See the [module documentation](self) for the full protocol.
pub struct ThreadPool {
    shared: Arc<PoolShared>,
}

impl ThreadPool {
    /// Create a pool with no event or error handlers.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        Self::with_handlers(config, None, None)
    }

    /// Create a pool with optional error and event handlers.
    ///
    /// The pool starts in the `New` state with zero tasks in flight and no
    /// live workers; [`start`](Self::start) makes it accept submissions.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if `config` fails validation.
    pub fn with_handlers(
        config: PoolConfig,
        on_error: Option<ErrorHandler>,
        on_event: Option<EventHandler>,
    ) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let shards = (0..config.worker_count).map(|_| Shard::default()).collect();

        Ok(Self {
            shared: Arc::new(PoolShared {
                instance_id: Uuid::new_v4(),
                state: AtomicU8::new(STATE_NEW),
                running: AtomicBool::new(false),
                in_flight: AtomicUsize::new(0),
                next_seq: AtomicU64::new(0),
                shards,
                live_workers: TrackedRwLock::new(HashMap::new()),
                on_error,
                on_event,
                config,
            }),
        })
    }

    /// Transition the pool from `New` to `Running`.
    ///
    /// No threads are created here; workers appear on first submission.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::AlreadyRunning`] when called in any state other
    /// than `New`.
    pub fn start(&self) -> Result<(), PoolError> {
        let shared = &self.shared;
        shared
            .state
            .compare_exchange(
                STATE_NEW,
                STATE_RUNNING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|_| PoolError::AlreadyRunning(shared.config.name.clone()))?;
        shared.running.store(true, Ordering::Release);
        info!(
            pool = %shared.config.name,
            instance = %shared.instance_id,
            workers = shared.config.worker_count,
            capacity = shared.capacity(),
            "pool started"
        );
        Ok(())
    }

    /// Submit a task with the default priority `0`.
    ///
    /// # Errors
    ///
    /// See [`submit_with_priority`](Self::submit_with_priority).
    pub fn submit<F>(&self, job: F) -> Result<TaskHandle, PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit_with_priority(job, 0)
    }

    /// Submit a task; larger `priority` values run first within a shard.
    ///
    /// Accepting the task increments the in-flight count, picks the shard
    /// from it, makes sure the shard has a live worker, and enqueues.
    ///
    /// # Errors
    ///
    /// - [`PoolError::NotRunning`] if the pool was not started or stopped.
    /// - [`PoolError::TaskCountFull`] if accepting would exceed
    ///   `max_tasks_per_worker * worker_count`; the rejection is also routed
    ///   to the `on_error` handler and the task is not enqueued.
    /// - [`PoolError::Spawn`] if the OS refused to create a worker thread.
    pub fn submit_with_priority<F>(&self, job: F, priority: i32) -> Result<TaskHandle, PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let shared = &self.shared;
        if !shared.running.load(Ordering::Acquire) {
            return Err(PoolError::NotRunning(shared.config.name.clone()));
        }

        let seq = shared.next_seq.fetch_add(1, Ordering::SeqCst);
        let in_flight = shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let capacity = shared.capacity();
        if in_flight > capacity {
            shared.in_flight.fetch_sub(1, Ordering::SeqCst);
            let report = ErrorReport {
                kind: ErrorReportKind::TaskCountFull,
                worker_index: None,
                task: Some(TaskSnapshot {
                    seq,
                    priority,
                    status: TaskStatus::Created,
                }),
                message: format!(
                    "pool `{}` is full: {in_flight} tasks in flight, capacity {capacity}",
                    shared.config.name
                ),
            };
            warn!(pool = %shared.config.name, in_flight, capacity, "submission rejected");
            shared.report(&report);
            return Err(PoolError::TaskCountFull {
                pool: shared.config.name.clone(),
                in_flight,
                capacity,
            });
        }

        let shard_index = in_flight % shared.config.worker_count;
        if let Err(spawn_err) = self.ensure_worker(shard_index) {
            shared.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(spawn_err);
        }

        let cancel = Arc::new(AtomicBool::new(false));
        shared.shards[shard_index].push(ThreadTask {
            job: Box::new(job),
            status: TaskStatus::Created,
            priority,
            seq,
            cancel: Arc::clone(&cancel),
        });
        debug!(pool = %shared.config.name, seq, priority, shard = shard_index, "task submitted");
        Ok(TaskHandle::new(seq, cancel))
    }

    /// Stop the pool and join every live worker.
    ///
    /// Sets the running flag, wakes every shard so parked workers re-check
    /// it, then drains and joins worker handles until none remain. Tasks a
    /// worker is executing run to completion; tasks still queued when the
    /// stop signal lands are dropped unrun. After `stop` returns, `submit`
    /// fails with [`PoolError::NotRunning`]. Idempotent after the first
    /// call.
    ///
    /// Must not be called from inside a task running on this pool; a worker
    /// cannot join itself.
    pub fn stop(&self) {
        let shared = &self.shared;
        if shared.state.swap(STATE_STOPPED, Ordering::SeqCst) == STATE_STOPPED {
            return;
        }
        shared.running.store(false, Ordering::Release);
        info!(pool = %shared.config.name, instance = %shared.instance_id, "pool stopping");

        for shard in &*shared.shards {
            shard.wake_all();
        }

        // A submission racing with stop may insert a worker after the first
        // drain; loop until the live map stays empty.
        loop {
            let drained: Vec<(usize, JoinHandle<()>)> = {
                let mut live = shared.live_workers.lock();
                live.drain().collect()
            };
            if drained.is_empty() {
                break;
            }
            for (index, handle) in drained {
                if handle.join().is_err() {
                    warn!(pool = %shared.config.name, worker = index, "worker thread panicked");
                }
            }
        }

        info!(pool = %shared.config.name, "pool stopped");
    }

    /// Whether the pool currently accepts submissions.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PoolState {
        match self.shared.state.load(Ordering::SeqCst) {
            STATE_RUNNING => PoolState::Running,
            STATE_STOPPED => PoolState::Stopped,
            _ => PoolState::New,
        }
    }

    /// Pool name, as used in events and logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// Configured worker count.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.shared.config.worker_count
    }

    /// Accepted-but-unfinished task count.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    /// Number of worker threads currently alive.
    #[must_use]
    pub fn live_worker_count(&self) -> usize {
        self.shared.live_workers.lock_shared().len()
    }

    /// Make sure shard `index` has a live worker, spawning one if needed.
    fn ensure_worker(&self, index: usize) -> Result<(), PoolError> {
        let shared = &self.shared;
        {
            let live = shared.live_workers.lock_shared();
            if live.contains_key(&index) {
                return Ok(());
            }
        }

        let mut live = shared.live_workers.lock();
        if live.contains_key(&index) {
            return Ok(());
        }

        let worker_shared = Arc::clone(shared);
        let handle = thread::Builder::new()
            .name(format!("{}-worker-{index}", shared.config.name))
            .spawn(move || worker_loop(&worker_shared, index))
            .map_err(|e| PoolError::Spawn(e.to_string()))?;
        live.insert(index, handle);
        debug!(pool = %shared.config.name, worker = index, "worker thread created");
        Ok(())
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Signal shutdown but do not join; workers drain on their own.
        // Explicit stop() is the graceful path.
        let shared = &self.shared;
        if shared.state.swap(STATE_STOPPED, Ordering::SeqCst) != STATE_STOPPED {
            shared.running.store(false, Ordering::Release);
            for shard in &*shared.shards {
                shard.wake_all();
            }
            debug!(pool = %shared.config.name, "pool dropped without stop; workers exit on idle");
        }
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("name", &self.shared.config.name)
            .field("state", &self.state())
            .field("worker_count", &self.shared.config.worker_count)
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

/// Body of one worker thread, bound to shard `index`.
fn worker_loop(shared: &Arc<PoolShared>, index: usize) {
    debug!(pool = %shared.config.name, worker = index, "worker loop entered");
    let shard = &shared.shards[index];

    while shared.running.load(Ordering::Acquire) {
        shared.emit(PoolSignal::Waiting, None, index);

        let polled = shard.poll_timeout_until(shared.config.max_idle(), || {
            !shared.running.load(Ordering::Acquire)
        });
        let Some(mut task) = polled else {
            // Idle interval elapsed (or shutdown); the next submission to
            // this shard re-creates the worker.
            debug!(pool = %shared.config.name, worker = index, "idle timeout, worker exiting");
            break;
        };

        shared.emit(PoolSignal::Picked, Some(task.snapshot()), index);

        if task.cancel.load(Ordering::SeqCst) {
            task.status = TaskStatus::Canceled;
            shared.emit(PoolSignal::Canceled, Some(task.snapshot()), index);
            shared.in_flight.fetch_sub(1, Ordering::SeqCst);
            continue;
        }

        task.status = TaskStatus::Running;
        let mut snapshot = task.snapshot();
        shared.emit(PoolSignal::Running, Some(snapshot), index);

        match catch_unwind(AssertUnwindSafe(task.job)) {
            Ok(()) => {
                snapshot.status = TaskStatus::Finished;
                shared.emit(PoolSignal::Finished, Some(snapshot), index);
            }
            Err(panic) => {
                let message = panic_message(&panic);
                warn!(
                    pool = %shared.config.name,
                    worker = index,
                    seq = snapshot.seq,
                    panic = %message,
                    "task panicked"
                );
                shared.report(&ErrorReport {
                    kind: ErrorReportKind::TaskError,
                    worker_index: Some(index),
                    task: Some(snapshot),
                    message,
                });
            }
        }

        shared.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    let mut live = shared.live_workers.lock();
    live.remove(&index);
    debug!(pool = %shared.config.name, worker = index, "worker loop exited");
}

/// Best-effort extraction of a panic payload message.
fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "task panicked with a non-string payload".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::ThreadPoolBuilder;
    use std::time::Duration;

    #[test]
    fn test_submit_before_start_fails() {
        let pool = ThreadPoolBuilder::named("cold").build().unwrap();
        let result = pool.submit(|| {});
        assert!(matches!(result, Err(PoolError::NotRunning(_))));
    }

    #[test]
    fn test_double_start_fails() {
        let pool = ThreadPoolBuilder::named("twice").build().unwrap();
        pool.start().unwrap();
        assert!(matches!(pool.start(), Err(PoolError::AlreadyRunning(_))));
        pool.stop();
    }

    #[test]
    fn test_stop_is_idempotent() {
        let pool = ThreadPoolBuilder::named("idem").build().unwrap();
        pool.start().unwrap();
        pool.stop();
        pool.stop();
        assert_eq!(pool.state(), PoolState::Stopped);
        assert!(matches!(pool.submit(|| {}), Err(PoolError::NotRunning(_))));
    }

    #[test]
    fn test_start_after_stop_fails() {
        let pool = ThreadPoolBuilder::named("dead").build().unwrap();
        pool.start().unwrap();
        pool.stop();
        assert!(matches!(pool.start(), Err(PoolError::AlreadyRunning(_))));
    }

    #[test]
    fn test_tasks_run_and_in_flight_drains() {
        let pool = ThreadPoolBuilder::named("drain")
            .with_worker_count(2)
            .with_max_idle(Duration::from_millis(200))
            .build()
            .unwrap();
        pool.start().unwrap();

        let done = Arc::new(crate::SyncPoint::new(4));
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..20 {
            let counter = Arc::clone(&counter);
            let done = Arc::clone(&done);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                done.add_flag(1);
            })
            .unwrap();
        }

        done.wait_flag(20);
        pool.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 20);
        assert_eq!(pool.in_flight(), 0);
        assert_eq!(pool.live_worker_count(), 0);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&payload), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("kaput"));
        assert_eq!(panic_message(&payload), "kaput");

        let payload: Box<dyn Any + Send> = Box::new(17_u32);
        assert_eq!(
            panic_message(&payload),
            "task panicked with a non-string payload"
        );
    }
}

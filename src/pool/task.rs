//! Task types for the worker pool.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

/// Lifecycle status of a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Accepted, waiting in a shard.
    Created,
    /// Currently executing on a worker.
    Running,
    /// Ran to completion.
    Finished,
    /// Marked cancelled before its run began; the worker skipped it.
    Canceled,
}

/// Point-in-time view of a task, carried in events and error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSnapshot {
    /// Submission sequence number, unique within the pool.
    pub seq: u64,
    /// Submission priority; larger runs first within a shard.
    pub priority: i32,
    /// Status at the time the snapshot was taken.
    pub status: TaskStatus,
}

/// Handle returned by `submit`.
///
/// The only operation is cancellation: a task cancelled before a worker
/// dequeues it is skipped with a `Canceled` event instead of being run.
/// Cancellation cannot interrupt a task that is already executing.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    seq: u64,
    cancel: Arc<AtomicBool>,
}

impl TaskHandle {
    pub(crate) fn new(seq: u64, cancel: Arc<AtomicBool>) -> Self {
        Self { seq, cancel }
    }

    /// Submission sequence number of the task.
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Mark the task cancelled.
    pub fn cancel(&self) {
        self.cancel.store(true, AtomicOrdering::SeqCst);
    }

    /// Whether the task has been marked cancelled.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.cancel.load(AtomicOrdering::SeqCst)
    }
}

/// A queued unit of work: the callable plus scheduling metadata.
pub(crate) struct ThreadTask {
    pub(crate) job: Box<dyn FnOnce() + Send>,
    pub(crate) status: TaskStatus,
    pub(crate) priority: i32,
    pub(crate) seq: u64,
    pub(crate) cancel: Arc<AtomicBool>,
}

impl ThreadTask {
    pub(crate) fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            seq: self.seq,
            priority: self.priority,
            status: self.status,
        }
    }
}

impl std::fmt::Debug for ThreadTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadTask")
            .field("seq", &self.seq)
            .field("priority", &self.priority)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ThreadTask {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for ThreadTask {}

impl PartialOrd for ThreadTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ThreadTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first; FIFO within a priority class (earlier seq
        // ranks larger so the max-heap serves it first).
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

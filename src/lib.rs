//! # Workshard
//!
//! Thread coordination primitives, blocking queues, and a sharded worker pool.
//!
//! This library provides the concurrency core for services that shard work
//! across a fixed set of OS threads: a multi-slot rendezvous primitive, a
//! family of lock wrappers with holder tracking, lock-aware container
//! wrappers, blocking FIFO/priority queues, and a worker pool that creates
//! threads lazily and retires them when idle.
//!
//! ## Building blocks
//!
//! - [`SyncPoint`] - condition-variable rendezvous with N independent wait
//!   slots, a shared counter flag, predicate and deadline waits, and an
//!   observer callback invoked once per wait completion
//! - [`lock`] - a uniform protocol over exclusive, recursive, and
//!   shared locks with `is_held_by_current_thread` introspection
//! - [`ConcurrentContainer`] - atomic read/write closures over an inner
//!   container, dispatching to a shared lock when the lock kind supports it
//! - [`ConcurrentQueue`] / [`ConcurrentPriorityQueue`] - blocking queues
//!   composed from the container wrapper and a `SyncPoint`
//! - [`ThreadPool`] - per-worker priority shards, lazy thread creation,
//!   idle teardown, lifecycle events, and panic containment
//!
//! ## Quick example
//!
//! ```
//! use workshard::builders::ThreadPoolBuilder;
//! use workshard::SyncPoint;
//! use std::sync::Arc;
//!
//! let done = Arc::new(SyncPoint::new(4));
//! let pool = ThreadPoolBuilder::named("example")
//!     .with_worker_count(2)
//!     .build()
//!     .unwrap();
//! pool.start().unwrap();
//!
//! for _ in 0..8 {
//!     let done = Arc::clone(&done);
//!     pool.submit(move || {
//!         done.add_flag(1);
//!     })
//!     .unwrap();
//! }
//!
//! done.wait_flag(8);
//! pool.stop();
//! ```

/// Builders to construct pools from configuration.
pub mod builders;
/// Configuration models for pools.
pub mod config;
/// Lock-aware container wrapper with atomic read/write closures.
pub mod container;
/// Error types shared across the crate.
pub mod error;
/// Lock protocol traits and tracked lock implementations.
pub mod lock;
/// Sharded worker pool with lifecycle events.
pub mod pool;
/// Blocking FIFO and priority queues.
pub mod queue;
/// Multi-slot rendezvous primitive.
pub mod sync_point;
/// Shared utilities.
pub mod util;

pub use container::{ConcurrentContainer, ContainerLock, ExclusiveKind, SharedKind};
pub use error::{AppResult, PoolError};
pub use pool::{
    ErrorReport, ErrorReportKind, PoolEvent, PoolSignal, PoolState, TaskHandle, TaskSnapshot,
    TaskStatus, ThreadPool,
};
pub use queue::{ConcurrentPriorityQueue, ConcurrentQueue};
pub use sync_point::{SyncPoint, WaitOutcome};

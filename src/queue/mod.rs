//! Blocking queues composed from [`ConcurrentContainer`] and [`SyncPoint`].
//!
//! Both queues keep an internal [`SyncPoint`] whose flag mirrors the element
//! count. Consumers block on the flag; producers advance it under the same
//! write lock that mutates the container, so a successful wait always
//! corresponds to a push that happened before it.
//!
//! [`ConcurrentContainer`]: crate::container::ConcurrentContainer
//! [`SyncPoint`]: crate::sync_point::SyncPoint

pub mod fifo;
pub mod priority;

pub use fifo::ConcurrentQueue;
pub use priority::ConcurrentPriorityQueue;

use std::time::Duration;

/// Retry interval for the untimed blocking `poll` loops.
pub(crate) const POLL_RETRY: Duration = Duration::from_millis(2000);

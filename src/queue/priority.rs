//! Blocking priority queue.

use std::collections::BinaryHeap;
use std::time::Duration;

use crate::container::{ConcurrentContainer, ContainerLock, SharedKind};
use crate::sync_point::SyncPoint;

use super::POLL_RETRY;

/// Thread-safe priority queue with blocking consumers.
///
/// The largest element (by `Ord`) is served first. Elements that compare
/// equal are drained in an unspecified relative order; callers that need
/// FIFO within a priority class should embed an arrival sequence in their
/// ordering, as the pool's task type does.
///
/// The lock kind `K` decides how read-only inspection acquires the lock:
/// the default [`SharedKind`] admits concurrent readers (and requires
/// `T: Sync` for cross-thread use); [`ExclusiveKind`] serialises reads and
/// only needs `T: Send`.
///
/// [`ExclusiveKind`]: crate::container::ExclusiveKind
///
/// Consumers block on an internal [`SyncPoint`] whose flag mirrors the
/// element count; [`poll_timeout`](Self::poll_timeout) re-checks the heap
/// under the write lock after every wake-up, because another consumer may
/// have drained the queue between the wake and the lock acquisition.
///
/// # Examples
///
/// ```
/// use workshard::ConcurrentPriorityQueue;
///
/// let queue = ConcurrentPriorityQueue::new();
/// queue.push(1);
/// queue.push(9);
/// queue.push(5);
///
/// assert_eq!(queue.poll(), 9);
/// assert_eq!(queue.poll(), 5);
/// assert_eq!(queue.poll(), 1);
/// ```
#[derive(Debug)]
pub struct ConcurrentPriorityQueue<T: Ord, K = SharedKind<BinaryHeap<T>>>
where
    K: ContainerLock<BinaryHeap<T>>,
{
    items: ConcurrentContainer<BinaryHeap<T>, K>,
    sync: SyncPoint,
}

impl<T: Ord, K: ContainerLock<BinaryHeap<T>>> Default for ConcurrentPriorityQueue<T, K> {
    fn default() -> Self {
        Self::with_lock_kind()
    }
}

impl<T: Ord> ConcurrentPriorityQueue<T> {
    /// Create an empty queue with the default shared lock kind.
    #[must_use]
    pub fn new() -> Self {
        Self::with_lock_kind()
    }
}

impl<T: Ord, K: ContainerLock<BinaryHeap<T>>> ConcurrentPriorityQueue<T, K> {
    /// Create an empty queue guarded by the lock kind `K`.
    #[must_use]
    pub fn with_lock_kind() -> Self {
        Self {
            items: ConcurrentContainer::default(),
            sync: SyncPoint::default(),
        }
    }

    /// Insert `value` and wake blocked consumers.
    pub fn push(&self, value: T) {
        self.items.write_atomic(|heap| {
            heap.push(value);
            self.sync.add_flag(1);
        });
    }

    /// Remove the top element if one exists.
    ///
    /// Silent no-op on an empty queue; this is the supported way to call it
    /// unconditionally.
    pub fn pop(&self) {
        self.items.write_atomic(|heap| {
            if heap.pop().is_some() {
                self.sync.add_flag(-1);
            }
        });
    }

    /// Block until an element is available, then remove and return it.
    pub fn poll(&self) -> T {
        loop {
            if let Some(value) = self.poll_timeout(POLL_RETRY) {
                return value;
            }
        }
    }

    /// Block up to `timeout` for an element; remove and return it, or return
    /// `None` if nothing arrived.
    ///
    /// A timeout leaves the queue and its flag untouched.
    pub fn poll_timeout(&self, timeout: Duration) -> Option<T> {
        self.poll_timeout_until(timeout, || false)
    }

    /// [`poll_timeout`](Self::poll_timeout) that additionally gives up as
    /// soon as `abort` returns `true` after a wake-up.
    ///
    /// Shutdown paths pair this with [`wake_all`](Self::wake_all) to release
    /// parked consumers without waiting out the timeout.
    pub fn poll_timeout_until(
        &self,
        timeout: Duration,
        abort: impl FnMut() -> bool,
    ) -> Option<T> {
        let mut taken = None;
        self.sync.wait_flag_for_with(1, timeout, abort, |_, outcome| {
            if outcome.flag_satisfied {
                taken = self.items.write_atomic(BinaryHeap::pop);
            }
        });
        if taken.is_some() {
            self.sync.add_flag(-1);
        }
        taken
    }

    /// Block until an element is available and return a copy of the top
    /// without removing it.
    pub fn top(&self) -> T
    where
        T: Clone,
    {
        loop {
            let mut copied = None;
            self.sync.wait_flag_with(1, |_, outcome| {
                if outcome.flag_satisfied {
                    copied = self.items.read_atomic(|heap| heap.peek().cloned());
                }
            });
            if let Some(value) = copied {
                return value;
            }
        }
    }

    /// Number of queued elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read_atomic(BinaryHeap::len)
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every element and reset the internal flag to zero.
    pub fn clear(&self) {
        self.items.write_atomic(|heap| {
            heap.clear();
            self.sync.reset();
        });
    }

    /// Force every blocked consumer to re-evaluate its wait condition.
    pub fn wake_all(&self) {
        self.sync.wake_all();
    }

    /// Diagnostic: current value of the internal rendezvous flag. Mirrors
    /// the element count except in the short window between a take and its
    /// flag decrement.
    #[must_use]
    pub fn signal_flag(&self) -> i32 {
        self.sync.read_flag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_priority_order() {
        let queue = ConcurrentPriorityQueue::new();
        for value in [1, 9, 5, 9, 2] {
            queue.push(value);
        }

        let drained: Vec<i32> = (0..5).map(|_| queue.poll()).collect();
        assert_eq!(drained, vec![9, 9, 5, 2, 1]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_on_empty_is_noop() {
        let queue: ConcurrentPriorityQueue<i32> = ConcurrentPriorityQueue::new();
        queue.pop();
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.signal_flag(), 0);
    }

    #[test]
    fn test_poll_zero_timeout_empty() {
        let queue: ConcurrentPriorityQueue<i32> = ConcurrentPriorityQueue::new();
        assert_eq!(queue.poll_timeout(Duration::ZERO), None);
        assert_eq!(queue.signal_flag(), 0);
    }

    #[test]
    fn test_poll_blocks_until_push() {
        let queue = Arc::new(ConcurrentPriorityQueue::new());
        let queue2 = Arc::clone(&queue);

        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            queue2.push(42);
        });

        assert_eq!(queue.poll_timeout(Duration::from_millis(500)), Some(42));
        producer.join().unwrap();
    }

    #[test]
    fn test_top_does_not_remove() {
        let queue = ConcurrentPriorityQueue::new();
        queue.push(3);
        queue.push(8);

        assert_eq!(queue.top(), 8);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.poll(), 8);
    }

    #[test]
    fn test_clear_resets_flag() {
        let queue = ConcurrentPriorityQueue::new();
        queue.push(1);
        queue.push(2);
        queue.clear();

        assert_eq!(queue.len(), 0);
        assert_eq!(queue.signal_flag(), 0);
        assert_eq!(queue.poll_timeout(Duration::ZERO), None);
    }

    #[test]
    fn test_each_pushed_value_polled_once() {
        let queue = Arc::new(ConcurrentPriorityQueue::new());
        let mut consumers = vec![];

        for _ in 0..4 {
            let queue = Arc::clone(&queue);
            consumers.push(thread::spawn(move || {
                let mut mine = vec![];
                while let Some(v) = queue.poll_timeout(Duration::from_millis(200)) {
                    mine.push(v);
                }
                mine
            }));
        }

        for value in 0..100 {
            queue.push(value);
        }

        let mut all: Vec<i32> = consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }
}

//! Blocking FIFO queue.

use std::collections::VecDeque;
use std::time::Duration;

use crate::container::{ConcurrentContainer, ContainerLock, SharedKind};
use crate::sync_point::SyncPoint;

use super::POLL_RETRY;

/// Thread-safe FIFO queue with blocking consumers.
///
/// Same construction as [`ConcurrentPriorityQueue`]: a lock-aware container
/// plus an internal [`SyncPoint`] whose flag mirrors the element count.
/// Elements are served strictly in push order.
///
/// [`ConcurrentPriorityQueue`]: crate::ConcurrentPriorityQueue
///
/// # Examples
///
/// ```
/// use workshard::ConcurrentQueue;
///
/// let queue = ConcurrentQueue::new();
/// queue.push("a");
/// queue.push("b");
///
/// assert_eq!(queue.poll(), "a");
/// assert_eq!(queue.poll(), "b");
/// ```
#[derive(Debug)]
pub struct ConcurrentQueue<T, K = SharedKind<VecDeque<T>>>
where
    K: ContainerLock<VecDeque<T>>,
{
    items: ConcurrentContainer<VecDeque<T>, K>,
    sync: SyncPoint,
}

impl<T, K: ContainerLock<VecDeque<T>>> Default for ConcurrentQueue<T, K> {
    fn default() -> Self {
        Self::with_lock_kind()
    }
}

impl<T> ConcurrentQueue<T> {
    /// Create an empty queue with the default shared lock kind.
    #[must_use]
    pub fn new() -> Self {
        Self::with_lock_kind()
    }
}

impl<T, K: ContainerLock<VecDeque<T>>> ConcurrentQueue<T, K> {
    /// Create an empty queue guarded by the lock kind `K`.
    ///
    /// The queue keeps a single wait slot; consumers beyond the first queue
    /// on slot admission.
    #[must_use]
    pub fn with_lock_kind() -> Self {
        Self {
            items: ConcurrentContainer::default(),
            sync: SyncPoint::new(1),
        }
    }

    /// Append `value` and wake blocked consumers.
    pub fn push(&self, value: T) {
        self.items.write_atomic(|queue| {
            queue.push_back(value);
            self.sync.add_flag(1);
        });
    }

    /// Remove the oldest element if one exists; silent no-op when empty.
    pub fn pop(&self) {
        self.items.write_atomic(|queue| {
            if queue.pop_front().is_some() {
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
    /// `None` if nothing arrived. A timeout leaves the queue untouched.
    pub fn poll_timeout(&self, timeout: Duration) -> Option<T> {
        self.poll_timeout_until(timeout, || false)
    }

    /// [`poll_timeout`](Self::poll_timeout) that additionally gives up as
    /// soon as `abort` returns `true` after a wake-up.
    pub fn poll_timeout_until(
        &self,
        timeout: Duration,
        abort: impl FnMut() -> bool,
    ) -> Option<T> {
        let mut taken = None;
        self.sync.wait_flag_for_with(1, timeout, abort, |_, outcome| {
            if outcome.flag_satisfied {
                taken = self.items.write_atomic(VecDeque::pop_front);
            }
        });
        if taken.is_some() {
            self.sync.add_flag(-1);
        }
        taken
    }

    /// Block until an element is available and return a copy of the oldest
    /// without removing it.
    pub fn front(&self) -> T
    where
        T: Clone,
    {
        loop {
            let mut copied = None;
            self.sync.wait_flag_with(1, |_, outcome| {
                if outcome.flag_satisfied {
                    copied = self.items.read_atomic(|queue| queue.front().cloned());
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
        self.items.read_atomic(VecDeque::len)
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every element and reset the internal flag to zero.
    pub fn clear(&self) {
        self.items.write_atomic(|queue| {
            queue.clear();
            self.sync.reset();
        });
    }

    /// Force every blocked consumer to re-evaluate its wait condition.
    pub fn wake_all(&self) {
        self.sync.wake_all();
    }

    /// Diagnostic: current value of the internal rendezvous flag.
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
    fn test_fifo_order() {
        let queue = ConcurrentQueue::new();
        for value in 0..5 {
            queue.push(value);
        }
        let drained: Vec<i32> = (0..5).map(|_| queue.poll()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_front_does_not_remove() {
        let queue = ConcurrentQueue::new();
        queue.push(10);
        queue.push(20);

        assert_eq!(queue.front(), 10);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_pop_empty_noop_and_timed_poll() {
        let queue: ConcurrentQueue<u8> = ConcurrentQueue::new();
        queue.pop();
        assert_eq!(queue.poll_timeout(Duration::ZERO), None);
        assert_eq!(queue.signal_flag(), 0);
    }

    #[test]
    fn test_producer_consumer() {
        let queue = Arc::new(ConcurrentQueue::new());
        let queue2 = Arc::clone(&queue);

        let producer = thread::spawn(move || {
            for value in 0..50 {
                queue2.push(value);
            }
        });

        let mut seen = vec![];
        for _ in 0..50 {
            seen.push(queue.poll());
        }
        producer.join().unwrap();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_poll_timeout_until_abort() {
        let queue: Arc<ConcurrentQueue<u8>> = Arc::new(ConcurrentQueue::new());
        let queue2 = Arc::clone(&queue);
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let stop2 = Arc::clone(&stop);

        let consumer = thread::spawn(move || {
            let started = std::time::Instant::now();
            let polled = queue2.poll_timeout_until(Duration::from_secs(10), || {
                stop2.load(std::sync::atomic::Ordering::SeqCst)
            });
            (polled, started.elapsed())
        });

        thread::sleep(Duration::from_millis(50));
        stop.store(true, std::sync::atomic::Ordering::SeqCst);
        queue.wake_all();

        let (polled, elapsed) = consumer.join().unwrap();
        assert_eq!(polled, None);
        assert!(elapsed < Duration::from_secs(5));
    }
}

//! Multi-slot rendezvous primitive.
//!
//! A [`SyncPoint`] coordinates threads around a shared signed counter (the
//! *flag*) and a fixed set of *wait slots*. Each slot is an independent
//! mutex/condvar pair hosting at most one waiter at a time, so up to `W`
//! threads wait concurrently without sharing a condition variable; further
//! callers queue on the slot admission list in FIFO order.
//!
//! Waits come in four shapes, each with an optional observer callback that
//! receives the [`WaitOutcome`] exactly once per completed wait:
//!
//! - predicate waits ([`SyncPoint::wait_for_predicate`])
//! - pure timed sleeps and timed predicate waits ([`SyncPoint::wait_timeout`])
//! - flag-counter waits ([`SyncPoint::wait_flag`])
//! - timed flag waits with an extra predicate ([`SyncPoint::wait_flag_for`])
//!
//! [`SyncPoint::add_flag`], [`SyncPoint::reset`], and [`SyncPoint::wake_all`]
//! wake every slot so parked waiters re-evaluate their conditions within one
//! wake cycle.
//!
//! # Examples
//!
//! ```
//! use workshard::SyncPoint;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let point = Arc::new(SyncPoint::new(4));
//! let mut producers = vec![];
//!
//! for _ in 0..10 {
//!     let point = Arc::clone(&point);
//!     producers.push(thread::spawn(move || {
//!         point.add_flag(1);
//!     }));
//! }
//!
//! let outcome = point.wait_flag(10);
//! assert!(outcome.flag_satisfied);
//! assert_eq!(point.read_flag(), 10);
//!
//! for p in producers {
//!     p.join().unwrap();
//! }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Default number of wait slots.
pub const DEFAULT_SLOT_COUNT: usize = 4;

/// Classification of a completed wait, reported to the observer and returned
/// from every wait method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOutcome {
    /// The timed wait exhausted its deadline with neither the predicate nor
    /// the flag condition satisfied. Always `false` for untimed waits.
    pub timed_out: bool,
    /// The caller-supplied predicate held at the final evaluation.
    pub predicate_fired: bool,
    /// The flag condition (`flag >= target`) held at the final evaluation.
    /// Always `false` for waits without a flag target.
    pub flag_satisfied: bool,
    /// The flag target of this wait, `None` for non-flag waits.
    pub flag_target: Option<i32>,
}

/// One mutex/condvar pair; hosts at most one waiter at a time.
#[derive(Debug, Default)]
struct WaitSlot {
    parked: Mutex<()>,
    signal: Condvar,
}

/// Condition-variable coordinator with `W` concurrent wait slots, a counter
/// flag, predicate and deadline waits, and observer callbacks.
///
/// See the [module documentation](self) for the wait protocol.
#[derive(Debug)]
pub struct SyncPoint {
    flag: AtomicI32,
    slots: Box<[WaitSlot]>,
    free_slots: Mutex<VecDeque<usize>>,
    admission: Condvar,
}

impl Default for SyncPoint {
    fn default() -> Self {
        Self::new(DEFAULT_SLOT_COUNT)
    }
}

impl SyncPoint {
    /// Create a sync point with `slot_count` independent wait slots.
    ///
    /// # Panics
    ///
    /// Panics if `slot_count` is zero.
    #[must_use]
    pub fn new(slot_count: usize) -> Self {
        assert!(slot_count >= 1, "a SyncPoint needs at least one wait slot");
        let slots = (0..slot_count).map(|_| WaitSlot::default()).collect();
        Self {
            flag: AtomicI32::new(0),
            slots,
            free_slots: Mutex::new((0..slot_count).collect()),
            admission: Condvar::new(),
        }
    }

    /// Block until `predicate` returns `true`.
    pub fn wait_for_predicate(&self, predicate: impl FnMut() -> bool) -> WaitOutcome {
        self.wait_inner(None, predicate, None, |_, _| {})
    }

    /// Block until `predicate` returns `true`, then invoke `observer` with
    /// the outcome.
    pub fn wait_for_predicate_with(
        &self,
        predicate: impl FnMut() -> bool,
        observer: impl FnMut(&Self, &WaitOutcome),
    ) -> WaitOutcome {
        self.wait_inner(None, predicate, None, observer)
    }

    /// Sleep until `timeout` elapses or the slot is woken spuriously.
    ///
    /// With no predicate to satisfy, the outcome always reports
    /// `timed_out == true`. A zero timeout returns immediately.
    pub fn wait_timeout(&self, timeout: Duration) -> WaitOutcome {
        self.wait_inner(Some(timeout), || false, None, |_, _| {})
    }

    /// Block until `predicate` returns `true` or `timeout` elapses.
    pub fn wait_timeout_with(
        &self,
        timeout: Duration,
        predicate: impl FnMut() -> bool,
        observer: impl FnMut(&Self, &WaitOutcome),
    ) -> WaitOutcome {
        self.wait_inner(Some(timeout), predicate, None, observer)
    }

    /// Block until the flag reaches `target`.
    pub fn wait_flag(&self, target: i32) -> WaitOutcome {
        self.wait_inner(None, || false, Some(target), |_, _| {})
    }

    /// Block until the flag reaches `target`, then invoke `observer`.
    pub fn wait_flag_with(
        &self,
        target: i32,
        observer: impl FnMut(&Self, &WaitOutcome),
    ) -> WaitOutcome {
        self.wait_inner(None, || false, Some(target), observer)
    }

    /// Block until the flag reaches `target` or `timeout` elapses.
    pub fn wait_flag_for(&self, target: i32, timeout: Duration) -> WaitOutcome {
        self.wait_inner(Some(timeout), || false, Some(target), |_, _| {})
    }

    /// Block until the flag reaches `target`, `predicate` returns `true`, or
    /// `timeout` elapses; then invoke `observer` with the outcome.
    pub fn wait_flag_for_with(
        &self,
        target: i32,
        timeout: Duration,
        predicate: impl FnMut() -> bool,
        observer: impl FnMut(&Self, &WaitOutcome),
    ) -> WaitOutcome {
        self.wait_inner(Some(timeout), predicate, Some(target), observer)
    }

    /// Atomically add `delta` to the flag, wake all slots, and return the new
    /// value.
    pub fn add_flag(&self, delta: i32) -> i32 {
        let new_value = self.flag.fetch_add(delta, Ordering::SeqCst) + delta;
        self.wake_all();
        new_value
    }

    /// Current flag value.
    #[must_use]
    pub fn read_flag(&self) -> i32 {
        self.flag.load(Ordering::SeqCst)
    }

    /// Set the flag back to zero and wake all slots.
    pub fn reset(&self) {
        self.flag.store(0, Ordering::SeqCst);
        self.wake_all();
    }

    /// Wake every slot so parked waiters re-evaluate their conditions.
    ///
    /// This is the escape hatch used by shutdown paths: a waiter whose
    /// condition still does not hold goes back to sleep.
    pub fn wake_all(&self) {
        for slot in &*self.slots {
            // Taking the slot mutex serialises with a waiter that has
            // evaluated its condition but not yet parked.
            let _parked = slot.parked.lock();
            slot.signal.notify_all();
        }
    }

    /// Number of waiters currently occupying a slot.
    ///
    /// The value is a momentary hint; it may be stale by the time the caller
    /// inspects it.
    #[must_use]
    pub fn active_waiter_count(&self) -> usize {
        self.slots.len() - self.free_slots.lock().len()
    }

    /// Total number of wait slots.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Pop a free slot index, parking on the admission condvar until one is
    /// available.
    fn acquire_slot(&self) -> usize {
        let mut free = self.free_slots.lock();
        let index = loop {
            if let Some(index) = free.pop_front() {
                break index;
            }
            self.admission.wait(&mut free);
        };
        drop(free);
        self.admission.notify_one();
        index
    }

    /// Return a slot index to the free list and wake one admission waiter.
    fn release_slot(&self, index: usize) {
        self.free_slots.lock().push_back(index);
        self.admission.notify_one();
    }

    /// Core wait protocol: acquire a slot, park on its condvar under the
    /// composite condition, release the slot, then report the outcome.
    fn wait_inner<P, O>(
        &self,
        timeout: Option<Duration>,
        mut predicate: P,
        flag_target: Option<i32>,
        mut observer: O,
    ) -> WaitOutcome
    where
        P: FnMut() -> bool,
        O: FnMut(&Self, &WaitOutcome),
    {
        let slot_index = self.acquire_slot();
        let slot = &self.slots[slot_index];

        let mut predicate_fired = false;
        let mut flag_satisfied = false;
        let mut timed_out = false;
        {
            let mut parked = slot.parked.lock();
            let mut should_park = |_: &mut ()| {
                predicate_fired = predicate();
                flag_satisfied = flag_target
                    .is_some_and(|target| self.flag.load(Ordering::SeqCst) >= target);
                !(predicate_fired || flag_satisfied)
            };
            if let Some(timeout) = timeout {
                timed_out = slot
                    .signal
                    .wait_while_for(&mut parked, &mut should_park, timeout)
                    .timed_out();
            } else {
                slot.signal.wait_while(&mut parked, &mut should_park);
            }
        }
        self.release_slot(slot_index);

        let outcome = WaitOutcome {
            timed_out,
            predicate_fired,
            flag_satisfied,
            flag_target,
        };
        observer(self, &outcome);
        outcome
    }
}

impl Drop for SyncPoint {
    fn drop(&mut self) {
        // Destroying a SyncPoint with parked waiters is a programmer error;
        // safe code cannot reach it without an Arc cycle.
        debug_assert_eq!(
            self.active_waiter_count(),
            0,
            "SyncPoint dropped while waiters are parked"
        );
    }
}

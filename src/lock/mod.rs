//! Uniform lock protocol with holder tracking.
//!
//! This module defines a capability-style protocol over the crate's lock
//! wrappers:
//!
//! - [`Lockable`] - exclusive acquisition: `lock`, `try_lock_for`,
//!   `is_locked`, `is_held_by_current_thread`
//! - [`SharedLockable`] - adds the read side of a read-write discipline:
//!   any number of shared holders or one exclusive holder
//!
//! Three implementations cover the useful variant matrix:
//!
//! | Type | Discipline |
//! |------|-----------|
//! | [`TrackedMutex`] | exclusive |
//! | [`TrackedReentrantMutex`] | exclusive, recursive |
//! | [`TrackedRwLock`] | shared or exclusive |
//!
//! All three are backed by `parking_lot`, whose locks support timed
//! acquisition natively, so there are no separate "timed" variants.
//!
//! # Scoped acquisition
//!
//! Acquisition returns a guard whose lifetime brackets the hold: the lock is
//! taken on construction and released on any exit path when the guard drops.
//! Guards cannot move across threads. Because release only happens by
//! dropping a guard that proves acquisition, unlock-by-non-holder is not
//! representable in this API.
//!
//! # Holder tracking
//!
//! Each lock records which thread currently holds it (and, for shared locks,
//! the set of reading threads). The record is updated after a successful
//! acquisition and cleared before the underlying release, so an observer
//! never sees a stale holder for a lock that has already been handed to
//! another thread. [`Lockable::is_held_by_current_thread`] is intended for
//! debug assertions and diagnostics, not for flow control.
//!
//! # Examples
//!
//! ```
//! use workshard::lock::{Lockable, TrackedMutex};
//!
//! let lock = TrackedMutex::new(0);
//! {
//!     let mut guard = lock.lock();
//!     *guard += 1;
//!     assert!(lock.is_held_by_current_thread());
//! }
//! assert!(!lock.is_locked());
//! ```

mod tracked;

use std::ops::Deref;
use std::time::Duration;

pub use tracked::{
    TrackedMutex, TrackedMutexGuard, TrackedReentrantMutex, TrackedReentrantMutexGuard,
    TrackedRwLock, TrackedRwReadGuard, TrackedRwWriteGuard,
};

/// Exclusive lock protocol.
///
/// Implementors hand out RAII guards; dropping the guard releases the lock.
pub trait Lockable {
    /// The protected value.
    type Target: ?Sized;
    /// Guard proving exclusive acquisition.
    type Guard<'a>: Deref<Target = Self::Target>
    where
        Self: 'a;

    /// Block until the lock is acquired.
    fn lock(&self) -> Self::Guard<'_>;

    /// Try to acquire the lock, giving up after `timeout`.
    ///
    /// Returns within the requested duration plus OS scheduling slack.
    fn try_lock_for(&self, timeout: Duration) -> Option<Self::Guard<'_>>;

    /// Whether the lock is currently held exclusively by any thread.
    fn is_locked(&self) -> bool;

    /// Whether the calling thread currently holds the lock exclusively.
    fn is_held_by_current_thread(&self) -> bool;
}

/// Shared (read) side of a read-write lock protocol.
pub trait SharedLockable: Lockable {
    /// Guard proving shared acquisition.
    type SharedGuard<'a>: Deref<Target = Self::Target>
    where
        Self: 'a;

    /// Block until a shared hold is acquired.
    fn lock_shared(&self) -> Self::SharedGuard<'_>;

    /// Try to acquire a shared hold, giving up after `timeout`.
    fn try_lock_shared_for(&self, timeout: Duration) -> Option<Self::SharedGuard<'_>>;

    /// Whether any thread currently holds the lock in shared mode.
    fn is_locked_shared(&self) -> bool;

    /// Whether the calling thread currently holds a shared hold.
    fn is_shared_held_by_current_thread(&self) -> bool;
}

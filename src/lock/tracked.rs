//! Lock wrappers that record their holders.
//!
//! The wrappers delegate blocking and timed acquisition to `parking_lot` and
//! maintain a per-lock holder record guarded by a dedicated internal mutex.
//! The record is written after the underlying lock is acquired and cleared in
//! the guard's `Drop` before the underlying guard releases.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::thread::{self, ThreadId};
use std::time::Duration;

use lock_api::{ReentrantMutex, ReentrantMutexGuard};
use parking_lot::{Mutex, RawMutex, RawThreadId, RwLock};

use super::{Lockable, SharedLockable};

// ---------------------------------------------------------------------------
// TrackedMutex
// ---------------------------------------------------------------------------

/// Exclusive lock with holder tracking.
#[derive(Debug, Default)]
pub struct TrackedMutex<T> {
    owner: Mutex<Option<ThreadId>>,
    inner: Mutex<T>,
}

/// Guard for a [`TrackedMutex`]; releases the lock on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct TrackedMutexGuard<'a, T> {
    lock: &'a TrackedMutex<T>,
    inner: parking_lot::MutexGuard<'a, T>,
}

impl<T> TrackedMutex<T> {
    /// Create a new unlocked mutex protecting `value`.
    pub const fn new(value: T) -> Self {
        Self {
            owner: Mutex::new(None),
            inner: Mutex::new(value),
        }
    }

    /// Consume the lock and return the protected value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }

    fn note_acquired(&self) {
        *self.owner.lock() = Some(thread::current().id());
    }
}

impl<T> Lockable for TrackedMutex<T> {
    type Target = T;
    type Guard<'a>
        = TrackedMutexGuard<'a, T>
    where
        Self: 'a;

    fn lock(&self) -> TrackedMutexGuard<'_, T> {
        let inner = self.inner.lock();
        self.note_acquired();
        TrackedMutexGuard { lock: self, inner }
    }

    fn try_lock_for(&self, timeout: Duration) -> Option<TrackedMutexGuard<'_, T>> {
        let inner = self.inner.try_lock_for(timeout)?;
        self.note_acquired();
        Some(TrackedMutexGuard { lock: self, inner })
    }

    fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    fn is_held_by_current_thread(&self) -> bool {
        *self.owner.lock() == Some(thread::current().id())
    }
}

impl<T> Deref for TrackedMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for TrackedMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T> Drop for TrackedMutexGuard<'_, T> {
    fn drop(&mut self) {
        // Clear the record first; the inner guard releases afterwards.
        *self.lock.owner.lock() = None;
    }
}

// ---------------------------------------------------------------------------
// TrackedReentrantMutex
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ReentrantHolder {
    owner: Option<ThreadId>,
    depth: usize,
}

/// Recursive exclusive lock with holder tracking.
///
/// The owning thread may acquire the lock again without deadlocking; the
/// holder record keeps the recursion depth and is cleared when the last
/// guard drops.
#[derive(Debug, Default)]
pub struct TrackedReentrantMutex<T> {
    holder: Mutex<ReentrantHolder>,
    inner: ReentrantMutex<RawMutex, RawThreadId, T>,
}

/// Guard for a [`TrackedReentrantMutex`].
///
/// Multiple guards may coexist on the owning thread, so the guard only
/// provides shared access to the protected value.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct TrackedReentrantMutexGuard<'a, T> {
    lock: &'a TrackedReentrantMutex<T>,
    inner: ReentrantMutexGuard<'a, RawMutex, RawThreadId, T>,
}

impl<T> TrackedReentrantMutex<T> {
    /// Create a new unlocked recursive mutex protecting `value`.
    pub const fn new(value: T) -> Self {
        Self {
            holder: Mutex::new(ReentrantHolder {
                owner: None,
                depth: 0,
            }),
            inner: ReentrantMutex::new(value),
        }
    }

    /// Current recursion depth of the owning thread, zero when unlocked.
    pub fn hold_depth(&self) -> usize {
        self.holder.lock().depth
    }

    fn note_acquired(&self) {
        let mut holder = self.holder.lock();
        holder.owner = Some(thread::current().id());
        holder.depth += 1;
    }
}

impl<T> Lockable for TrackedReentrantMutex<T> {
    type Target = T;
    type Guard<'a>
        = TrackedReentrantMutexGuard<'a, T>
    where
        Self: 'a;

    fn lock(&self) -> TrackedReentrantMutexGuard<'_, T> {
        let inner = self.inner.lock();
        self.note_acquired();
        TrackedReentrantMutexGuard { lock: self, inner }
    }

    fn try_lock_for(&self, timeout: Duration) -> Option<TrackedReentrantMutexGuard<'_, T>> {
        let inner = self.inner.try_lock_for(timeout)?;
        self.note_acquired();
        Some(TrackedReentrantMutexGuard { lock: self, inner })
    }

    fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    fn is_held_by_current_thread(&self) -> bool {
        let holder = self.holder.lock();
        holder.depth > 0 && holder.owner == Some(thread::current().id())
    }
}

impl<T> Deref for TrackedReentrantMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> Drop for TrackedReentrantMutexGuard<'_, T> {
    fn drop(&mut self) {
        let mut holder = self.lock.holder.lock();
        holder.depth = holder.depth.saturating_sub(1);
        if holder.depth == 0 {
            holder.owner = None;
        }
    }
}

// ---------------------------------------------------------------------------
// TrackedRwLock
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RwHolders {
    writer: Option<ThreadId>,
    readers: HashMap<ThreadId, usize>,
}

/// Read-write lock with holder tracking.
///
/// Any number of shared holders or one exclusive holder. Exclusive
/// acquisition goes through [`Lockable`]; shared acquisition through
/// [`SharedLockable`].
#[derive(Debug, Default)]
pub struct TrackedRwLock<T> {
    holders: Mutex<RwHolders>,
    inner: RwLock<T>,
}

/// Exclusive (write) guard for a [`TrackedRwLock`].
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct TrackedRwWriteGuard<'a, T> {
    lock: &'a TrackedRwLock<T>,
    inner: parking_lot::RwLockWriteGuard<'a, T>,
}

/// Shared (read) guard for a [`TrackedRwLock`].
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct TrackedRwReadGuard<'a, T> {
    lock: &'a TrackedRwLock<T>,
    inner: parking_lot::RwLockReadGuard<'a, T>,
}

impl<T> TrackedRwLock<T> {
    /// Create a new unlocked read-write lock protecting `value`.
    pub fn new(value: T) -> Self {
        Self {
            holders: Mutex::new(RwHolders {
                writer: None,
                readers: HashMap::new(),
            }),
            inner: RwLock::new(value),
        }
    }

    fn note_write_acquired(&self) {
        self.holders.lock().writer = Some(thread::current().id());
    }

    fn note_read_acquired(&self) {
        let mut holders = self.holders.lock();
        *holders.readers.entry(thread::current().id()).or_insert(0) += 1;
    }
}

impl<T> Lockable for TrackedRwLock<T> {
    type Target = T;
    type Guard<'a>
        = TrackedRwWriteGuard<'a, T>
    where
        Self: 'a;

    fn lock(&self) -> TrackedRwWriteGuard<'_, T> {
        let inner = self.inner.write();
        self.note_write_acquired();
        TrackedRwWriteGuard { lock: self, inner }
    }

    fn try_lock_for(&self, timeout: Duration) -> Option<TrackedRwWriteGuard<'_, T>> {
        let inner = self.inner.try_write_for(timeout)?;
        self.note_write_acquired();
        Some(TrackedRwWriteGuard { lock: self, inner })
    }

    fn is_locked(&self) -> bool {
        self.inner.is_locked_exclusive()
    }

    fn is_held_by_current_thread(&self) -> bool {
        self.holders.lock().writer == Some(thread::current().id())
    }
}

impl<T> SharedLockable for TrackedRwLock<T> {
    type SharedGuard<'a>
        = TrackedRwReadGuard<'a, T>
    where
        Self: 'a;

    fn lock_shared(&self) -> TrackedRwReadGuard<'_, T> {
        let inner = self.inner.read();
        self.note_read_acquired();
        TrackedRwReadGuard { lock: self, inner }
    }

    fn try_lock_shared_for(&self, timeout: Duration) -> Option<TrackedRwReadGuard<'_, T>> {
        let inner = self.inner.try_read_for(timeout)?;
        self.note_read_acquired();
        Some(TrackedRwReadGuard { lock: self, inner })
    }

    fn is_locked_shared(&self) -> bool {
        !self.holders.lock().readers.is_empty()
    }

    fn is_shared_held_by_current_thread(&self) -> bool {
        self.holders
            .lock()
            .readers
            .contains_key(&thread::current().id())
    }
}

impl<T> Deref for TrackedRwWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for TrackedRwWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T> Drop for TrackedRwWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.holders.lock().writer = None;
    }
}

impl<T> Deref for TrackedRwReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> Drop for TrackedRwReadGuard<'_, T> {
    fn drop(&mut self) {
        let mut holders = self.lock.holders.lock();
        let me = thread::current().id();
        if let Some(count) = holders.readers.get_mut(&me) {
            *count -= 1;
            if *count == 0 {
                holders.readers.remove(&me);
            }
        }
    }
}

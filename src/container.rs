//! Lock-aware container wrapper.
//!
//! [`ConcurrentContainer`] pairs an inner container with a lock kind and
//! exposes two primitives: [`read_atomic`](ConcurrentContainer::read_atomic)
//! and [`write_atomic`](ConcurrentContainer::write_atomic). Each runs a
//! closure entirely under the appropriate lock, so no intermediate state is
//! ever observable.
//!
//! Whether `read_atomic` takes a shared or an exclusive hold is decided by
//! the lock kind's [`ContainerLock`] implementation: [`SharedKind`] reads
//! under a shared (read) lock, [`ExclusiveKind`] reads under the same
//! exclusive lock it writes with.
//!
//! # Examples
//!
//! ```
//! use workshard::container::{ConcurrentContainer, SharedKind};
//!
//! let numbers: ConcurrentContainer<Vec<i32>, SharedKind<Vec<i32>>> =
//!     ConcurrentContainer::default();
//!
//! numbers.write_atomic(|v| v.extend([3, 1, 2]));
//! let total: i32 = numbers.read_atomic(|v| v.iter().sum());
//! assert_eq!(total, 6);
//! ```

use parking_lot::{Mutex, RwLock};

/// Capability trait for lock kinds that can guard a container.
///
/// A kind decides how [`read`](Self::read) acquires the lock; `write` is
/// always exclusive.
pub trait ContainerLock<T> {
    /// Wrap `value` in a fresh, unlocked instance of this kind.
    fn wrap(value: T) -> Self;

    /// Run `f` with read access to the value, entirely under the lock.
    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R;

    /// Run `f` with exclusive access to the value, entirely under the lock.
    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R;

    /// Consume the kind and return the inner value.
    fn into_inner(self) -> T;
}

/// Lock kind that serialises readers and writers alike.
#[derive(Debug, Default)]
pub struct ExclusiveKind<T>(Mutex<T>);

impl<T> ContainerLock<T> for ExclusiveKind<T> {
    fn wrap(value: T) -> Self {
        Self(Mutex::new(value))
    }

    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.lock())
    }

    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.lock())
    }

    fn into_inner(self) -> T {
        self.0.into_inner()
    }
}

/// Lock kind that admits concurrent readers and one exclusive writer.
#[derive(Debug, Default)]
pub struct SharedKind<T>(RwLock<T>);

impl<T> ContainerLock<T> for SharedKind<T> {
    fn wrap(value: T) -> Self {
        Self(RwLock::new(value))
    }

    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.read())
    }

    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.write())
    }

    fn into_inner(self) -> T {
        self.0.into_inner()
    }
}

/// Thread-safe wrapper exposing atomic read and write closures over an inner
/// container.
///
/// The closure must not leak references to the inner value and must not
/// re-enter the same container; both would defeat the lock.
#[derive(Debug)]
pub struct ConcurrentContainer<T, K: ContainerLock<T>> {
    inner: K,
    _value: std::marker::PhantomData<fn() -> T>,
}

impl<T, K: ContainerLock<T>> ConcurrentContainer<T, K> {
    /// Wrap `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: K::wrap(value),
            _value: std::marker::PhantomData,
        }
    }

    /// Run `f` with read access to the inner container.
    ///
    /// Takes a shared hold when the lock kind supports one, otherwise the
    /// exclusive lock.
    pub fn read_atomic<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.read(f)
    }

    /// Run `f` with exclusive access to the inner container.
    pub fn write_atomic<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.inner.write(f)
    }

    /// Consume the wrapper and return the inner container.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Default, K: ContainerLock<T>> Default for ConcurrentContainer<T, K> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Cloning snapshots the inner container under the read lock. The snapshot
/// does not coordinate with writers racing in the source; quiesce the source
/// externally if a consistent copy matters.
impl<T: Clone, K: ContainerLock<T>> Clone for ConcurrentContainer<T, K> {
    fn clone(&self) -> Self {
        Self::new(self.read_atomic(Clone::clone))
    }
}

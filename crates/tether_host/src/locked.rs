//! # Locked Runtime
//!
//! A runtime behind a mutex, with no owner thread. Its executor runs each
//! callback inline, on the submitting thread, while holding the lock.
//!
//! Synchronous calls through it never cross threads. Re-entering the
//! executor from inside one of its own callbacks deadlocks on the lock.

use std::sync::Arc;

use parking_lot::Mutex;
use tether_core::{RuntimeCallback, RuntimeExecutor};

/// A runtime shared behind a lock.
pub struct LockedRuntime<R> {
    inner: Arc<Mutex<R>>,
}

impl<R> Clone for LockedRuntime<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> LockedRuntime<R> {
    /// Wraps `runtime`.
    #[must_use]
    pub fn new(runtime: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(runtime)),
        }
    }

    /// Returns an executor that runs callbacks inline under the lock.
    #[must_use]
    pub fn executor(&self) -> LockedExecutor<R> {
        LockedExecutor {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Locks the runtime for the duration of `f`.
    pub fn with<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        let mut runtime = self.inner.lock();
        f(&mut runtime)
    }

    /// Returns whether some thread currently holds the lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    /// Takes the runtime back if no other handle or executor is alive.
    ///
    /// # Errors
    ///
    /// Returns `self` unchanged while other handles remain.
    pub fn try_into_inner(self) -> Result<R, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl<R> std::fmt::Debug for LockedRuntime<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockedRuntime")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

/// Inline executor for a [`LockedRuntime`].
pub struct LockedExecutor<R> {
    inner: Arc<Mutex<R>>,
}

impl<R> Clone for LockedExecutor<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> RuntimeExecutor<R> for LockedExecutor<R> {
    #[inline]
    fn execute(&self, callback: RuntimeCallback<R>) {
        let mut runtime = self.inner.lock();
        callback(&mut *runtime);
    }
}

impl<R> std::fmt::Debug for LockedExecutor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockedExecutor").finish_non_exhaustive()
    }
}

//! # Reentrancy Guard
//!
//! Debug-build detector for a runtime being used from two threads at once.
//!
//! ## The Problem
//!
//! ```text
//! Owner thread:   enter ──── runtime call ──── exit
//! Rogue thread:          enter ── runtime call ── exit
//!                          ▲
//!                          └── two threads inside the VM: silent corruption
//! ```
//!
//! ## The Solution
//!
//! Every runtime operation brackets itself with [`ReentrancyGuard::enter`]
//! and [`ReentrancyGuard::exit`]. `enter` claims the guard with a
//! compare-and-swap of the owner token. The same thread may re-enter (the
//! depth grows). A different thread entering while the guard is held is a
//! programmer error, and the process aborts on the spot so the crash can be
//! analyzed.
//!
//! ## Memory Ordering
//!
//! The only race this must observe is enter/enter without an intervening
//! exit, which the atomicity of the CAS catches under any ordering. The
//! depth counter stands in for every other access the VM makes, so
//! acquire/release barriers here could hide a real ordering bug elsewhere.
//! Everything is `Relaxed`.
//!
//! ## Release Builds
//!
//! Without `debug_assertions` the guard is a zero-sized no-op.

use crate::thread::ThreadToken;

#[cfg(debug_assertions)]
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Raw owner value meaning "nobody holds the runtime".
#[cfg(debug_assertions)]
const NO_OWNER: u64 = 0;

/// Per-runtime ownership tracker.
///
/// One guard belongs to exactly one runtime. Never share a guard between
/// independent runtimes or unrelated accesses will be flagged as violations.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    /// Token of the thread inside the runtime, or `NO_OWNER`.
    #[cfg(debug_assertions)]
    owner: AtomicU64,
    /// Nesting depth. Only read or written by the owning thread; the atomic
    /// is there to keep the guard `Sync`, never for synchronization.
    #[cfg(debug_assertions)]
    depth: AtomicU32,
}

impl ReentrancyGuard {
    /// Creates an unheld guard.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            owner: AtomicU64::new(NO_OWNER),
            #[cfg(debug_assertions)]
            depth: AtomicU32::new(0),
        }
    }

    /// Claims the runtime for the calling thread.
    ///
    /// Nested calls from the owning thread are allowed. A call from any
    /// other thread while the guard is held aborts the process.
    #[inline]
    pub fn enter(&self) {
        #[cfg(debug_assertions)]
        {
            let this = ThreadToken::current().get();
            match self
                .owner
                .compare_exchange(NO_OWNER, this, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => {
                    assert_eq!(
                        self.depth.load(Ordering::Relaxed),
                        0,
                        "No owner recorded, but depth != 0"
                    );
                    self.depth.store(1, Ordering::Relaxed);
                }
                Err(current) if current == this => {
                    let depth = self.depth.load(Ordering::Relaxed);
                    assert_ne!(depth, 0, "Owner recorded, but depth == 0");
                    self.depth.store(depth + 1, Ordering::Relaxed);
                }
                Err(current) => violation(current, this),
            }
        }
    }

    /// Releases one level of nesting. The last exit clears the owner.
    ///
    /// # Panics
    ///
    /// Panics (debug builds) if the calling thread does not own the guard.
    #[inline]
    pub fn exit(&self) {
        #[cfg(debug_assertions)]
        {
            let this = ThreadToken::current().get();
            assert_eq!(
                self.owner.load(Ordering::Relaxed),
                this,
                "exit() called by a thread that does not own the runtime"
            );

            let depth = self.depth.load(Ordering::Relaxed) - 1;
            self.depth.store(depth, Ordering::Relaxed);

            if depth == 0 {
                let released = self
                    .owner
                    .compare_exchange(this, NO_OWNER, Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok();
                assert!(released, "Depth reached zero, but owner was not cleared");
            }
        }
    }

    /// Enters the guard and returns a scope that exits on drop, including
    /// during unwinding.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> GuardScope<'_> {
        self.enter();
        GuardScope { guard: self }
    }

    /// Returns the thread currently inside the runtime.
    ///
    /// Always `None` in release builds.
    #[must_use]
    pub fn owner(&self) -> Option<ThreadToken> {
        #[cfg(debug_assertions)]
        {
            ThreadToken::from_raw(self.owner.load(Ordering::Relaxed))
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    }

    /// Current nesting depth. Only meaningful on the owning thread.
    ///
    /// Always 0 in release builds.
    #[must_use]
    pub fn depth(&self) -> u32 {
        #[cfg(debug_assertions)]
        {
            self.depth.load(Ordering::Relaxed)
        }
        #[cfg(not(debug_assertions))]
        {
            0
        }
    }

    /// Returns whether some thread is inside the runtime.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.owner().is_some()
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            debug_assert!(!self.is_held(), "Runtime destroyed while still entered");
        }
    }
}

/// RAII scope returned by [`ReentrancyGuard::scope`].
#[derive(Debug)]
pub struct GuardScope<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for GuardScope<'_> {
    #[inline]
    fn drop(&mut self) {
        self.guard.exit();
    }
}

/// Two threads inside one runtime. There is no recovering from this.
#[cfg(debug_assertions)]
#[cold]
#[inline(never)]
fn violation(owner: u64, intruder: u64) -> ! {
    tracing::error!(
        owner,
        intruder,
        "runtime entered from a second thread without an intervening exit, aborting"
    );
    std::process::abort()
}

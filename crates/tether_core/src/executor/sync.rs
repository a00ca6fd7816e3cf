//! # Synchronous Execution
//!
//! Blocks the calling thread until a callback has run against the runtime,
//! and runs that callback *on the calling thread*.
//!
//! ## The Three Gates
//!
//! ```text
//! runtime_captured      opened by the wrapper once it holds the runtime
//! callback_executed     opened by the caller once the callback returned
//! owner_block_executed  opened by the wrapper right before it gives the
//!                       owner thread back to the executor
//! ```
//!
//! Order of events when the executor queues onto another thread:
//!
//! ```text
//! [caller] submit wrapper, wait runtime_captured
//! [owner]  wrapper: capture runtime, open runtime_captured, wait callback_executed
//! [caller] run callback against the lent runtime, open callback_executed
//! [caller] wait owner_block_executed
//! [owner]  wrapper: open owner_block_executed, return
//! [caller] return the callback's value
//! ```
//!
//! When the executor runs the wrapper inline (the caller already owns the
//! runtime), there is nobody to park. The wrapper runs the callback while it
//! still holds the runtime, then opens `runtime_captured` and
//! `owner_block_executed` together.
//!
//! ## Deadlock
//!
//! An executor that accepts the wrapper and never runs it blocks the caller
//! forever. There is no timeout. An executor that *drops* the wrapper
//! unrun is detected: every gate disconnects and the call fails with
//! [`ExecutorError::CallbackDropped`].
//!
//! An executor that keeps the wrapper and panics out of `execute` leaves
//! it inert: run later, it touches nothing of the departed caller.
//!
//! Calling this from the owner thread of a queueing executor deadlocks too:
//! the wrapper waits behind the very thread that is waiting for it.

#![allow(unsafe_code)]

use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};

use super::RuntimeExecutor;
use crate::error::{ExecutorError, ExecutorResult};
use crate::thread::ThreadToken;

/// Payload of the `runtime_captured` gate.
enum Captured<R> {
    /// The wrapper ran on the caller's own thread and already ran the callback.
    Inline,
    /// The owner is parked on `callback_executed`; the runtime is on loan.
    Lent(RuntimeLoan<R>),
}

/// Exclusive access to a runtime whose owner thread is parked.
struct RuntimeLoan<R>(NonNull<R>);

// SAFETY: the owner thread stays parked inside the wrapper until the borrower
// opens `callback_executed`, so the loan is the only live path to the
// runtime. `R: Send` makes using it from the borrowing thread sound.
unsafe impl<R: Send> Send for RuntimeLoan<R> {}

/// Type-erased handle to the caller's stack-resident callback driver.
struct InlineCall<R> {
    data: NonNull<()>,
    call: unsafe fn(NonNull<()>, &mut R),
}

// SAFETY: `call` is only invoked after checking that the executing thread is
// the one that created the handle and that its frame is still live.
unsafe impl<R> Send for InlineCall<R> {}

/// Cleared when the caller's frame is left, unwinding included. A wrapper
/// the executor kept past that point must not touch the driver.
struct FrameLive(Arc<AtomicBool>);

impl Drop for FrameLive {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

impl<R> InlineCall<R> {
    fn new<F: FnMut(&mut R)>(driver: &mut F) -> Self {
        unsafe fn trampoline<Rt, D: FnMut(&mut Rt)>(data: NonNull<()>, runtime: &mut Rt) {
            // SAFETY: `data` came from `&mut D` in `new`; `call` guarantees
            // the driver is still alive and unaliased.
            let driver = unsafe { &mut *data.cast::<D>().as_ptr() };
            driver(runtime);
        }

        Self {
            data: NonNull::from(driver).cast(),
            call: trampoline::<R, F>,
        }
    }

    /// # Safety
    ///
    /// Must run on the thread that created `self`, while the driver it
    /// points to is alive and not borrowed elsewhere.
    unsafe fn call(&self, runtime: &mut R) {
        unsafe { (self.call)(self.data, runtime) }
    }
}

/// Opens `callback_executed` and waits for `owner_block_executed` on every
/// exit path, unwinding included, so the owner thread is never left parked.
struct Release {
    callback_executed: Option<Sender<()>>,
    owner_block_executed: Receiver<()>,
}

impl Drop for Release {
    fn drop(&mut self) {
        if let Some(gate) = self.callback_executed.take() {
            let _ = gate.send(());
        }
        let _ = self.owner_block_executed.recv();
    }
}

/// Runs `callback` against the runtime behind `executor`, on the calling
/// thread, and blocks until the handshake with the owner thread is done.
///
/// # Errors
///
/// Returns [`ExecutorError::CallbackDropped`] if the executor dropped the
/// wrapper without running it (a queue that shut down, for example).
pub fn try_execute_synchronously_on_same_thread<R, E, F, T>(
    executor: &E,
    callback: F,
) -> ExecutorResult<T>
where
    R: Send + 'static,
    E: RuntimeExecutor<R> + ?Sized,
    F: FnOnce(&mut R) -> T,
{
    let mut callback = Some(callback);
    let mut result = None;
    let mut driver = |runtime: &mut R| {
        if let Some(callback) = callback.take() {
            result = Some(callback(runtime));
        }
    };

    let (captured_tx, runtime_captured) = bounded::<Captured<R>>(1);
    let (executed_tx, callback_executed) = bounded::<()>(1);
    let (block_tx, owner_block_executed) = bounded::<()>(1);

    let caller = ThreadToken::current();
    let inline = InlineCall::new(&mut driver);
    let live = Arc::new(AtomicBool::new(true));
    let wrapper_live = Arc::clone(&live);
    let _frame = FrameLive(live);

    executor.execute(Box::new(move |runtime: &mut R| {
        if ThreadToken::current() == caller {
            // Frame gone: the executor kept us and unwound past the caller.
            if !wrapper_live.load(Ordering::Relaxed) {
                return;
            }
            // SAFETY: same thread as the caller and its frame is live, so
            // the caller is still inside `execute`: once it leaves, it
            // blocks on `runtime_captured` until this wrapper reports back,
            // and `_frame` clears the flag on every exit. The driver is
            // alive and nothing else borrows it.
            unsafe { inline.call(runtime) };
            let _ = captured_tx.send(Captured::Inline);
            let _ = block_tx.send(());
            return;
        }

        let _ = captured_tx.send(Captured::Lent(RuntimeLoan(NonNull::from(runtime))));
        // The callback runs on the caller's thread here.
        let _ = callback_executed.recv();
        let _ = block_tx.send(());
    }));

    let captured = runtime_captured
        .recv()
        .map_err(|_| ExecutorError::CallbackDropped)?;

    let release = Release {
        callback_executed: Some(executed_tx),
        owner_block_executed,
    };

    if let Captured::Lent(loan) = captured {
        // SAFETY: the owner thread is parked on `callback_executed`, which
        // only opens when `release` drops.
        driver(unsafe { &mut *loan.0.as_ptr() });
    }
    drop(release);

    result.ok_or(ExecutorError::CallbackDropped)
}

/// Like [`try_execute_synchronously_on_same_thread`], for executors that
/// always deliver.
///
/// # Panics
///
/// Panics if the executor dropped the callback without running it.
pub fn execute_synchronously_on_same_thread<R, E, F, T>(executor: &E, callback: F) -> T
where
    R: Send + 'static,
    E: RuntimeExecutor<R> + ?Sized,
    F: FnOnce(&mut R) -> T,
{
    match try_execute_synchronously_on_same_thread(executor, callback) {
        Ok(value) => value,
        Err(error) => panic!("{error}"),
    }
}

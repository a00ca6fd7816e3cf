//! # Runtime Executors
//!
//! A [`RuntimeExecutor`] takes a callback and promises to run it, exactly
//! once and eventually, with exclusive access to the runtime on the
//! runtime's owner thread. It may run the callback inline (when the caller
//! already owns the runtime) or queue it. Either way `execute` returns
//! without waiting.
//!
//! Prefer holding an executor over holding the runtime itself: the
//! executor is what makes access safe.
//!
//! [`execute_synchronously_on_same_thread`] layers blocking, value-returning
//! semantics on top of any executor.

mod sync;

pub use sync::{execute_synchronously_on_same_thread, try_execute_synchronously_on_same_thread};

/// Callback handed to an executor.
pub type RuntimeCallback<R> = Box<dyn FnOnce(&mut R) + Send + 'static>;

/// Dispatches callbacks onto a runtime's owner thread.
pub trait RuntimeExecutor<R: ?Sized> {
    /// Submits `callback` for execution. Must not block on its completion.
    fn execute(&self, callback: RuntimeCallback<R>);
}

impl<R: ?Sized, F> RuntimeExecutor<R> for F
where
    F: Fn(RuntimeCallback<R>),
{
    #[inline]
    fn execute(&self, callback: RuntimeCallback<R>) {
        self(callback);
    }
}

//! # TETHER Core
//!
//! Safe access to a single-owner runtime from many threads:
//! - Dispatch work onto the runtime's owner thread
//! - Block until that work has run and hand back its result
//! - Fail fast when two threads touch the runtime at once
//!
//! ## Architecture Rules
//!
//! 1. **One owner at a time** - The executor serializes access, the guard detects violations
//! 2. **Zero-cost in release** - The reentrancy guard compiles to nothing without debug assertions
//! 3. **Strict rendezvous** - Capture, callback, release. Always in that order.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tether_core::{execute_synchronously_on_same_thread, RuntimeCallback};
//!
//! let executor = |callback: RuntimeCallback<MyRuntime>| queue.push(callback);
//! let answer = execute_synchronously_on_same_thread(&executor, |rt| rt.evaluate("6 * 7", "inline"));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod decorated;
pub mod error;
pub mod executor;
pub mod guard;
pub mod inspector;
pub mod runtime;
pub mod thread;

pub use decorated::DecoratedRuntime;
pub use error::{ExecutorError, ExecutorResult, RuntimeError, RuntimeResult};
pub use executor::{
    execute_synchronously_on_same_thread, try_execute_synchronously_on_same_thread,
    RuntimeCallback, RuntimeExecutor,
};
pub use guard::{GuardScope, ReentrancyGuard};
pub use inspector::{InspectorPage, InspectorRegistration, InspectorRegistry, PageId};
pub use runtime::{Runtime, Value};
pub use thread::ThreadToken;

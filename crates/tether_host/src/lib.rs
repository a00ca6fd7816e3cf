//! # TETHER Host
//!
//! Hosting layer around the core access protocol:
//! - A message queue thread that owns a runtime and drains jobs in FIFO order
//! - A mutex-locked runtime whose executor runs callbacks inline
//! - TOML-driven executor configuration
//! - A factory wiring decorated runtimes onto owner threads
//!
//! ## Example
//!
//! ```rust,ignore
//! use tether_host::{ExecutorConfig, ExecutorFactory};
//!
//! let config = ExecutorConfig::from_toml_file("config/executor.toml")?;
//! let host = ExecutorFactory::new(config)?.create_executor(MyRuntime::new())?;
//!
//! // Fire and forget
//! host.execute(|rt| { rt.drain_microtasks().ok(); });
//!
//! // Block until done, run on this thread
//! let engine = host.run_sync(|rt| rt.global("jsEngine"))?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod factory;
pub mod locked;
pub mod queue;

pub use config::ExecutorConfig;
pub use error::{HostError, HostResult};
pub use factory::{ExecutorFactory, RuntimeHost, ENGINE_TAG_GLOBAL};
pub use locked::{LockedExecutor, LockedRuntime};
pub use queue::{MessageQueueThread, QueueExecutor, QueueStats};

//! # Executor Factory
//!
//! Turns a bare runtime into a hosted one:
//!
//! ```text
//! R ──► DecoratedRuntime<R> ──► (inspector page?) ──► (jsEngine tag?) ──► MessageQueueThread
//! ```
//!
//! The resulting [`RuntimeHost`] is the only handle callers get. Everything
//! they do to the runtime goes through its executor.

use std::sync::Arc;

use tether_core::{
    DecoratedRuntime, InspectorRegistry, PageId, Runtime, RuntimeExecutor, Value,
};

use crate::config::ExecutorConfig;
use crate::error::HostResult;
use crate::queue::{MessageQueueThread, QueueExecutor, QueueStats};

/// Global that receives the configured engine tag.
///
/// Set on the global object, where any script or host code can read it.
/// Not on `Error.prototype`, where engine hosts usually put it so error
/// reports carry it: the [`Runtime`] trait has no prototype access.
pub const ENGINE_TAG_GLOBAL: &str = "jsEngine";

/// Builds [`RuntimeHost`]s from one configuration.
#[derive(Debug, Default)]
pub struct ExecutorFactory {
    config: ExecutorConfig,
    inspector: InspectorRegistry,
}

impl ExecutorFactory {
    /// Creates a factory with its own inspector registry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HostError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: ExecutorConfig) -> HostResult<Self> {
        Self::with_registry(config, InspectorRegistry::new())
    }

    /// Creates a factory that registers pages in a shared registry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HostError::InvalidConfig`] if `config` does not validate.
    pub fn with_registry(config: ExecutorConfig, inspector: InspectorRegistry) -> HostResult<Self> {
        config.validate()?;
        Ok(Self { config, inspector })
    }

    /// Turns inspector registration on or off for runtimes created later.
    pub fn set_enable_inspector(&mut self, enable: bool) {
        self.config.enable_inspector = enable;
    }

    /// Sets the page title for runtimes created later.
    pub fn set_inspector_name(&mut self, name: impl Into<String>) {
        self.config.inspector_name = name.into();
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Registry receiving this factory's inspector pages.
    #[must_use]
    pub fn inspector(&self) -> &InspectorRegistry {
        &self.inspector
    }

    /// Decorates `runtime` and moves it onto a new owner thread.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HostError::InvalidConfig`] if the configuration was
    /// made invalid through the setters, or [`crate::HostError::ThreadSpawn`]
    /// if the owner thread cannot start.
    pub fn create_executor<R>(&self, runtime: R) -> HostResult<RuntimeHost<R>>
    where
        R: Runtime + 'static,
    {
        self.config.validate()?;

        let mut decorated = if self.config.enable_inspector {
            DecoratedRuntime::with_inspector(runtime, &self.inspector, &self.config.inspector_name)
        } else {
            DecoratedRuntime::new(runtime)
        };

        if let Some(tag) = &self.config.engine_tag {
            decorated.set_global(ENGINE_TAG_GLOBAL, Value::from(tag.as_str()));
        }

        let inspector_page = decorated.inspector_page();
        tracing::info!(
            queue = %self.config.queue_name,
            vm = %decorated.description(),
            inspector = ?inspector_page,
            "creating runtime executor"
        );

        let queue = MessageQueueThread::spawn(
            self.config.queue_name.clone(),
            self.config.queue_capacity,
            decorated,
        )?;

        Ok(RuntimeHost {
            inspector_page,
            queue,
        })
    }
}

/// A decorated runtime living on its own owner thread.
///
/// Dropping the host stops the thread after the jobs already queued.
pub struct RuntimeHost<R: Runtime + 'static> {
    inspector_page: Option<PageId>,
    queue: MessageQueueThread<DecoratedRuntime<R>>,
}

impl<R: Runtime + 'static> RuntimeHost<R> {
    /// Executor for the decorated runtime.
    #[must_use]
    pub fn executor(&self) -> QueueExecutor<DecoratedRuntime<R>> {
        self.queue.executor()
    }

    /// Queues `job` without waiting.
    pub fn execute(&self, job: impl FnOnce(&mut DecoratedRuntime<R>) + Send + 'static) {
        self.queue.executor().execute(Box::new(job));
    }

    /// Runs `callback` on the calling thread while the owner thread waits,
    /// and returns its value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HostError::Executor`] if the job was dropped.
    pub fn run_sync<T>(&self, callback: impl FnOnce(&mut DecoratedRuntime<R>) -> T) -> HostResult<T> {
        self.queue.run_on_queue_sync(callback)
    }

    /// Evaluates `source` synchronously and returns its completion value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HostError::Runtime`] if the script fails, or
    /// [`crate::HostError::Executor`] if the job was dropped.
    pub fn evaluate(&self, source: &str, source_url: &str) -> HostResult<Value> {
        Ok(self.run_sync(|rt| rt.evaluate(source, source_url))??)
    }

    /// Inspector page registered for this runtime, if any.
    #[must_use]
    pub fn inspector_page(&self) -> Option<PageId> {
        self.inspector_page
    }

    /// Returns whether the calling thread is the owner thread.
    #[must_use]
    pub fn is_on_runtime_thread(&self) -> bool {
        self.queue.is_on_queue()
    }

    /// Owner queue counters.
    #[must_use]
    pub fn stats(&self) -> Arc<QueueStats> {
        self.queue.stats()
    }

    /// Stops the owner thread and destroys the runtime, inspector page first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HostError::QueuePanicked`] if a job panicked on the
    /// owner thread.
    pub fn shutdown(self) -> HostResult<()> {
        let runtime = self.queue.quit_synchronous()?;
        tracing::info!(vm = %runtime.description(), "runtime shut down");
        drop(runtime);
        Ok(())
    }
}

impl<R: Runtime + 'static> std::fmt::Debug for RuntimeHost<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeHost")
            .field("inspector_page", &self.inspector_page)
            .field("queue", &self.queue)
            .finish()
    }
}

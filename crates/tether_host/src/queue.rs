//! # Message Queue Thread
//!
//! A dedicated OS thread that owns a runtime and runs submitted jobs
//! against it, one at a time, in submission order.
//!
//! ## Architecture
//!
//! ```text
//!   Thread 1 ──┐
//!   Thread 2 ──┼──> [Job Channel (FIFO)] ──> [Owner Thread] ──> &mut Runtime
//!   Thread N ──┘     QueueExecutor clones      (single owner)
//! ```
//!
//! The owner thread is the only thread that ever holds the runtime, except
//! while it lends it to a caller blocked in
//! [`tether_core::execute_synchronously_on_same_thread`].
//!
//! ## Shutdown
//!
//! [`MessageQueueThread::quit_synchronous`] enqueues a quit marker. Jobs
//! submitted before it still run. Jobs behind it, and jobs submitted after
//! the thread is gone, are dropped unrun; a synchronous caller waiting on
//! one of them gets [`tether_core::ExecutorError::CallbackDropped`].
//!
//! Executors keep a receiver handle, so the channel never disconnects under
//! a submitter. Once the owner thread sets `closed`, whoever submits next
//! also drains: every job ends up run or counted in `jobs_dropped`.

use std::sync::atomic::{self, AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, SendTimeoutError, Sender};
use tether_core::{try_execute_synchronously_on_same_thread, RuntimeCallback, RuntimeExecutor};

use crate::error::{HostError, HostResult};

/// How long `shutdown` waits on a full queue before checking the thread.
const QUIT_RETRY: Duration = Duration::from_millis(10);

/// Job channel message.
enum Message<R> {
    /// Run this job against the runtime.
    Run(RuntimeCallback<R>),
    /// Leave the loop.
    Quit,
}

/// Counters for one queue.
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Jobs handed to an executor.
    pub jobs_submitted: AtomicU64,
    /// Jobs that ran to completion.
    pub jobs_executed: AtomicU64,
    /// Jobs dropped unrun because the queue had stopped.
    pub jobs_dropped: AtomicU64,
}

/// Cloneable executor feeding a [`MessageQueueThread`].
pub struct QueueExecutor<R> {
    sender: Sender<Message<R>>,
    receiver: Receiver<Message<R>>,
    closed: Arc<AtomicBool>,
    owner: ThreadId,
    name: Arc<str>,
    stats: Arc<QueueStats>,
}

impl<R> Clone for QueueExecutor<R> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
            closed: Arc::clone(&self.closed),
            owner: self.owner,
            name: Arc::clone(&self.name),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<R> QueueExecutor<R> {
    /// Returns whether the calling thread is the queue's owner thread.
    #[must_use]
    pub fn is_on_queue(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Name of the owner thread.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<R> RuntimeExecutor<R> for QueueExecutor<R> {
    fn execute(&self, callback: RuntimeCallback<R>) {
        self.stats.jobs_submitted.fetch_add(1, Ordering::Relaxed);
        if self.closed.load(Ordering::SeqCst) {
            drop(callback);
            self.stats.jobs_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(queue = %self.name, "job submitted after the queue stopped, dropping it");
            return;
        }

        // Cannot fail: `self.receiver` keeps the channel connected.
        let _ = self.sender.send(Message::Run(callback));

        // The owner may have closed between the check and the send.
        atomic::fence(Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            discard_pending(&self.receiver, &self.stats, &self.name);
        }
    }
}

impl<R> std::fmt::Debug for QueueExecutor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueExecutor")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

/// Owner thread holding a runtime of type `R`.
///
/// ## Usage
///
/// ```rust,ignore
/// let queue = MessageQueueThread::spawn("js", 0, runtime)?;
///
/// // Asynchronous
/// queue.execute(|rt| rt.set_global("ready", Value::from(true)));
///
/// // Synchronous, runs on this thread
/// let ready = queue.run_on_queue_sync(|rt| rt.global("ready"))?;
///
/// let runtime = queue.quit_synchronous()?;
/// ```
pub struct MessageQueueThread<R: Send + 'static> {
    executor: QueueExecutor<R>,
    handle: Option<JoinHandle<R>>,
}

impl<R: Send + 'static> MessageQueueThread<R> {
    /// Starts a thread named `name` that owns `runtime`.
    ///
    /// A `capacity` of 0 gives an unbounded queue. With a bounded queue,
    /// submitters block while it is full; submitting from the owner thread
    /// into its own full queue deadlocks.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::ThreadSpawn`] if the OS refuses the thread.
    pub fn spawn(name: impl Into<String>, capacity: usize, runtime: R) -> HostResult<Self> {
        let name: String = name.into();
        let (sender, receiver) = if capacity == 0 {
            unbounded()
        } else {
            bounded(capacity)
        };

        let stats = Arc::new(QueueStats::default());
        let closed = Arc::new(AtomicBool::new(false));
        let loop_receiver = receiver.clone();
        let loop_closed = Arc::clone(&closed);
        let loop_stats = Arc::clone(&stats);
        let loop_name = name.clone();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                run_loop(runtime, &loop_receiver, &loop_closed, &loop_stats, &loop_name)
            })
            .map_err(|e| HostError::ThreadSpawn(e.to_string()))?;

        tracing::info!(queue = %name, capacity, "owner thread started");

        Ok(Self {
            executor: QueueExecutor {
                sender,
                receiver,
                closed,
                owner: handle.thread().id(),
                name: name.into(),
                stats,
            },
            handle: Some(handle),
        })
    }

    /// Returns a cloneable executor for this queue.
    #[must_use]
    pub fn executor(&self) -> QueueExecutor<R> {
        self.executor.clone()
    }

    /// Submits a job without waiting for it.
    pub fn execute(&self, job: impl FnOnce(&mut R) + Send + 'static) {
        self.executor.execute(Box::new(job));
    }

    /// Runs `callback` on the calling thread with the runtime lent by the
    /// owner thread, and returns its value.
    ///
    /// Must not be called from the owner thread itself: the lending job
    /// would wait behind the caller forever.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Executor`] if the queue dropped the job.
    pub fn run_on_queue_sync<T>(&self, callback: impl FnOnce(&mut R) -> T) -> HostResult<T> {
        Ok(try_execute_synchronously_on_same_thread(&self.executor, callback)?)
    }

    /// Returns whether the calling thread is the owner thread.
    #[must_use]
    pub fn is_on_queue(&self) -> bool {
        self.executor.is_on_queue()
    }

    /// Name of the owner thread.
    #[must_use]
    pub fn name(&self) -> &str {
        self.executor.name()
    }

    /// Shared queue counters.
    #[must_use]
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.executor.stats)
    }

    /// Stops the owner thread after the jobs already queued, waits for it,
    /// and hands the runtime back.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::QueuePanicked`] if a job panicked on the owner
    /// thread.
    pub fn quit_synchronous(mut self) -> HostResult<R> {
        self.shutdown()
            .unwrap_or_else(|| Err(HostError::QueuePanicked(self.name().to_owned())))
    }

    fn request_quit(&self, handle: &JoinHandle<R>) {
        let mut quit = Message::Quit;
        // A dead owner never frees space in a full bounded queue.
        while let Err(SendTimeoutError::Timeout(back)) =
            self.executor.sender.send_timeout(quit, QUIT_RETRY)
        {
            if handle.is_finished() {
                return;
            }
            quit = back;
        }
    }

    fn shutdown(&mut self) -> Option<HostResult<R>> {
        let handle = self.handle.take()?;
        self.request_quit(&handle);
        Some(
            handle
                .join()
                .map_err(|_| HostError::QueuePanicked(self.name().to_owned())),
        )
    }
}

impl<R: Send + 'static> Drop for MessageQueueThread<R> {
    fn drop(&mut self) {
        if let Some(Err(e)) = self.shutdown() {
            tracing::error!(queue = %self.name(), error = %e, "owner thread ended abnormally");
        }
    }
}

impl<R: Send + 'static> std::fmt::Debug for MessageQueueThread<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueueThread")
            .field("executor", &self.executor)
            .field("running", &self.handle.is_some())
            .finish()
    }
}

/// Drops every queued job unrun. Returns how many there were.
fn discard_pending<R>(receiver: &Receiver<Message<R>>, stats: &QueueStats, name: &str) -> u64 {
    let dropped = receiver
        .try_iter()
        .filter(|message| matches!(message, Message::Run(_)))
        .count() as u64;
    if dropped > 0 {
        stats.jobs_dropped.fetch_add(dropped, Ordering::Relaxed);
        tracing::warn!(queue = name, dropped, "pending jobs dropped, queue stopped");
    }
    dropped
}

/// Closes the queue when the owner thread leaves its loop, panics included.
struct CloseOnExit<'a, R> {
    receiver: &'a Receiver<Message<R>>,
    closed: &'a AtomicBool,
    stats: &'a QueueStats,
    name: &'a str,
}

impl<R> Drop for CloseOnExit<'_, R> {
    fn drop(&mut self) {
        // Close first, then drain: a job sent after this drain sees `closed`
        // and is drained by its submitter.
        self.closed.store(true, Ordering::SeqCst);
        atomic::fence(Ordering::SeqCst);
        discard_pending(self.receiver, self.stats, self.name);
    }
}

/// Owner thread main loop.
fn run_loop<R>(
    mut runtime: R,
    receiver: &Receiver<Message<R>>,
    closed: &AtomicBool,
    stats: &QueueStats,
    name: &str,
) -> R {
    let close = CloseOnExit {
        receiver,
        closed,
        stats,
        name,
    };

    while let Ok(message) = receiver.recv() {
        match message {
            Message::Run(job) => {
                job(&mut runtime);
                stats.jobs_executed.fetch_add(1, Ordering::Relaxed);
            }
            Message::Quit => break,
        }
    }

    drop(close);

    tracing::info!(queue = name, "owner thread stopped");
    runtime
}

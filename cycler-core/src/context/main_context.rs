//! Main Context
//!
//! The host's UI thread as a serial execution context. The thread that
//! creates a [`MainContext`] becomes its main thread. Code running on that
//! thread is always in-context; other threads post jobs which run when the
//! host pumps the queue with [`MainContext::run_pending`] or
//! [`MainContext::run_until`], typically from its event loop.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use super::queue::JobQueue;
use super::{Executor, Job};

struct MainInner {
    thread: ThreadId,
    queue: JobQueue,
}

/// A host-pumped serial queue bound to the creating thread.
///
/// # Example
///
/// ```rust,ignore
/// let main = MainContext::new();
/// let counter = FeedbackLoop::new(initial, reduce, vec![], ExecutionContext::main(&main))?;
///
/// // In the host's event loop:
/// main.run_pending();
/// ```
#[derive(Clone)]
pub struct MainContext {
    inner: Arc<MainInner>,
}

impl MainContext {
    /// Bind a new main context to the current thread.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MainInner {
                thread: thread::current().id(),
                queue: JobQueue::new(),
            }),
        }
    }

    /// Check if the caller is on the bound thread.
    pub fn is_main_thread(&self) -> bool {
        thread::current().id() == self.inner.thread
    }

    /// Number of jobs waiting to be pumped.
    pub fn pending(&self) -> usize {
        self.inner.queue.len()
    }

    /// Run every queued job, including jobs queued by the jobs themselves.
    ///
    /// Returns the number of jobs run.
    ///
    /// # Panics
    ///
    /// Panics if called off the bound thread.
    pub fn run_pending(&self) -> usize {
        self.assert_main_thread("run_pending");

        let mut ran = 0;
        while let Some(job) = self.inner.queue.try_pop() {
            job();
            ran += 1;
        }
        ran
    }

    /// Pump the queue until `done` returns true or `timeout` elapses,
    /// sleeping while the queue is empty.
    ///
    /// Returns whether `done` was satisfied.
    ///
    /// # Panics
    ///
    /// Panics if called off the bound thread.
    pub fn run_until<F>(&self, timeout: Duration, mut done: F) -> bool
    where
        F: FnMut() -> bool,
    {
        self.assert_main_thread("run_until");

        let deadline = Instant::now() + timeout;
        loop {
            self.run_pending();
            if done() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }

            // Wake periodically so conditions satisfied off-queue are noticed.
            let wake = deadline.min(Instant::now() + Duration::from_millis(5));
            if let Some(job) = self.inner.queue.pop_until(wake) {
                job();
            }
        }
    }

    fn assert_main_thread(&self, operation: &str) {
        assert!(
            self.is_main_thread(),
            "MainContext::{operation} called off the main thread"
        );
    }
}

impl Default for MainContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for MainContext {
    fn is_current(&self) -> bool {
        self.is_main_thread()
    }

    fn post(&self, job: Job) -> bool {
        self.inner.queue.push(job)
    }
}

impl fmt::Debug for MainContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainContext")
            .field("thread", &self.inner.thread)
            .field("pending", &self.pending())
            .finish()
    }
}

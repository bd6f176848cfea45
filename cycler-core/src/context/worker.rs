//! Worker Context
//!
//! A dedicated OS thread draining a FIFO job queue. Jobs posted from any
//! thread run one at a time, in posting order, on the worker thread.
//!
//! Shutting the worker down closes its queue: jobs already accepted still
//! run, later posts are rejected, and the thread exits once the queue is
//! empty.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;

use super::queue::JobQueue;
use super::{Executor, Job};
use crate::error::{LoopError, Result};

struct WorkerInner {
    name: String,
    thread: ThreadId,
    queue: Arc<JobQueue>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for WorkerInner {
    fn drop(&mut self) {
        self.queue.close();
    }
}

/// A serial execution context backed by a dedicated thread.
#[derive(Clone)]
pub struct WorkerContext {
    inner: Arc<WorkerInner>,
}

impl WorkerContext {
    /// Spawn a worker thread with the given name.
    pub fn spawn(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.contains('\0') {
            return Err(LoopError::InvalidName(name));
        }

        let queue = Arc::new(JobQueue::new());

        let handle = {
            let queue = queue.clone();
            thread::Builder::new().name(name.clone()).spawn(move || {
                while let Some(job) = queue.pop_blocking() {
                    job();
                }
                tracing::trace!("worker queue closed, exiting");
            })?
        };

        tracing::debug!(worker = %name, "spawned worker context");

        Ok(Self {
            inner: Arc::new(WorkerInner {
                name,
                thread: handle.thread().id(),
                queue,
                handle: Mutex::new(Some(handle)),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether the worker has stopped accepting jobs.
    pub fn is_shut_down(&self) -> bool {
        self.inner.queue.is_closed()
    }
}

impl Executor for WorkerContext {
    fn is_current(&self) -> bool {
        thread::current().id() == self.inner.thread
    }

    fn post(&self, job: Job) -> bool {
        self.inner.queue.push(job)
    }

    fn shutdown(&self) {
        self.inner.queue.close();

        // The worker cannot join itself; it exits after the current job.
        if self.is_current() {
            return;
        }
        if let Some(handle) = self.inner.handle.lock().take() {
            if handle.join().is_err() {
                tracing::warn!(worker = %self.inner.name, "worker thread panicked");
            }
        }
    }
}

impl fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerContext")
            .field("name", &self.inner.name)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

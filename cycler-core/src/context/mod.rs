//! Execution Contexts
//!
//! All state mutation of a feedback loop is confined to one serial
//! execution context. Calls made from inside the context run synchronously;
//! calls made from outside are marshalled onto it as jobs and run later, in
//! FIFO order. Confinement, not a mutex, is what serializes reductions: a
//! reentrant same-context call runs immediately instead of deadlocking.
//!
//! # Contexts
//!
//! - [`MainContext`]: the host's UI thread, pumped by the host.
//! - [`WorkerContext`]: a dedicated thread owned by the loop.
//! - Any other [`Executor`] implementation, via [`ExecutionContext::custom`].

mod main_context;
mod queue;
mod scope;
mod worker;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

pub use main_context::MainContext;
pub use worker::WorkerContext;
pub(crate) use scope::ReductionScope;

use crate::error::Result;

/// A unit of work posted to an execution context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A serial executor that jobs can be confined to.
///
/// Implementations must run posted jobs one at a time, in posting order, and
/// report `is_current() == true` exactly when called from the code those jobs
/// run on.
pub trait Executor: Send + Sync + 'static {
    /// Check if the caller is running on this executor.
    fn is_current(&self) -> bool;

    /// Queue a job. Returns `false` if the executor no longer accepts jobs.
    fn post(&self, job: Job) -> bool;

    /// Stop accepting jobs and release any resources the executor holds.
    fn shutdown(&self) {}
}

/// Shuts the executor down once every owning handle has let go of it.
struct Lease(Arc<dyn Executor>);

impl Drop for Lease {
    fn drop(&mut self) {
        self.0.shutdown();
    }
}

/// The execution context handle held by a feedback loop.
///
/// Clones of an owned context share ownership: the executor is shut down
/// when the last clone is released or dropped.
pub struct ExecutionContext {
    executor: Arc<dyn Executor>,
    lease: Mutex<Option<Arc<Lease>>>,
}

impl ExecutionContext {
    /// Confine to the host's main context. The loop does not own it.
    pub fn main(main: &MainContext) -> Self {
        Self::custom(Arc::new(main.clone()))
    }

    /// Confine to a freshly spawned worker thread, owned by the loop and shut
    /// down when the last loop holding it is torn down.
    pub fn worker(name: impl Into<String>) -> Result<Self> {
        let executor: Arc<dyn Executor> = Arc::new(WorkerContext::spawn(name)?);
        Ok(Self {
            lease: Mutex::new(Some(Arc::new(Lease(executor.clone())))),
            executor,
        })
    }

    /// Confine to a caller-supplied executor. The loop does not own it.
    pub fn custom(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            lease: Mutex::new(None),
        }
    }

    pub fn is_current(&self) -> bool {
        self.executor.is_current()
    }

    pub fn post(&self, job: Job) -> bool {
        self.executor.post(job)
    }

    /// Whether this handle still holds a share of the executor's ownership.
    pub fn is_owned(&self) -> bool {
        self.lease.lock().is_some()
    }

    /// Give up this handle's share of ownership. The executor shuts down
    /// when no owning handle is left.
    pub(crate) fn release(&self) {
        let lease = self.lease.lock().take();
        drop(lease);
    }
}

impl Clone for ExecutionContext {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            lease: Mutex::new(self.lease.lock().clone()),
        }
    }
}

impl From<&MainContext> for ExecutionContext {
    fn from(main: &MainContext) -> Self {
        Self::main(main)
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("owned", &self.is_owned())
            .field("is_current", &self.is_current())
            .finish()
    }
}

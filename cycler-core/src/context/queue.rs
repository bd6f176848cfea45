//! FIFO job queue shared by the serial execution contexts.
//!
//! Producers on any thread push jobs; exactly one consumer thread pops them.
//! Once closed, pushes are rejected but already-queued jobs can still be
//! drained, so nothing accepted before closing is lost.

use std::collections::VecDeque;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use super::Job;

struct QueueState {
    jobs: VecDeque<Job>,
    closed: bool,
}

pub(crate) struct JobQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl JobQueue {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Append a job. Returns `false` if the queue has been closed.
    pub(crate) fn push(&self, job: Job) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.jobs.push_back(job);
        drop(state);

        self.ready.notify_one();
        true
    }

    pub(crate) fn try_pop(&self) -> Option<Job> {
        self.state.lock().jobs.pop_front()
    }

    /// Block until a job is available. Returns `None` once the queue is
    /// closed and empty.
    pub(crate) fn pop_blocking(&self) -> Option<Job> {
        let mut state = self.state.lock();
        loop {
            if let Some(job) = state.jobs.pop_front() {
                return Some(job);
            }
            if state.closed {
                return None;
            }
            self.ready.wait(&mut state);
        }
    }

    /// Block until a job is available or `deadline` passes.
    pub(crate) fn pop_until(&self, deadline: Instant) -> Option<Job> {
        let mut state = self.state.lock();
        loop {
            if let Some(job) = state.jobs.pop_front() {
                return Some(job);
            }
            if state.closed || self.ready.wait_until(&mut state, deadline).timed_out() {
                return state.jobs.pop_front();
            }
        }
    }

    pub(crate) fn close(&self) {
        self.state.lock().closed = true;
        self.ready.notify_all();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }
}

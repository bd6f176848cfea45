//! Latest-wins stream switching.
//!
//! [`SwitchLatest`] flattens a stream of [`Switch`] commands into the events
//! of at most one live inner stream. A `Start` command drops the current
//! inner stream before building the replacement; a `Stop` command drops it
//! without a replacement. Dropping an inner stream is its cancellation: a
//! dropped stream is never polled again, so it can never emit again.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::{BoxStream, Stream, StreamExt};

/// Builds an effect instance. Runs only after the predecessor was dropped.
pub type StartEffect<E> = Box<dyn FnOnce() -> BoxStream<'static, E> + Send>;

/// A command to the switch.
pub enum Switch<E> {
    /// Cancel the live instance, if any, then start a new one.
    Start(StartEffect<E>),

    /// Cancel the live instance, if any.
    Stop,
}

impl<E> fmt::Debug for Switch<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Switch::Start(_) => f.write_str("Start"),
            Switch::Stop => f.write_str("Stop"),
        }
    }
}

/// Stream adapter forwarding events of the most recently started instance.
///
/// Completes once the command stream has ended and the last instance has
/// completed.
pub struct SwitchLatest<E> {
    commands: Option<BoxStream<'static, Switch<E>>>,
    live: Option<BoxStream<'static, E>>,
    started: usize,
}

impl<E> SwitchLatest<E> {
    pub fn new(commands: BoxStream<'static, Switch<E>>) -> Self {
        Self {
            commands: Some(commands),
            live: None,
            started: 0,
        }
    }

    /// Number of instances started so far.
    #[cfg(test)]
    pub(crate) fn started(&self) -> usize {
        self.started
    }

    fn apply(&mut self, command: Switch<E>) {
        if self.live.take().is_some() {
            tracing::trace!(instance = self.started, "cancelled effect instance");
        }

        if let Switch::Start(start) = command {
            self.started += 1;
            tracing::trace!(instance = self.started, "starting effect instance");
            self.live = Some(start());
        }
    }
}

impl<E> Stream for SwitchLatest<E> {
    type Item = E;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<E>> {
        let this = self.get_mut();

        // Apply every pending command first so a stale instance never gets
        // polled after its replacement was requested.
        while let Some(commands) = this.commands.as_mut() {
            match commands.poll_next_unpin(cx) {
                Poll::Ready(Some(command)) => this.apply(command),
                Poll::Ready(None) => this.commands = None,
                Poll::Pending => break,
            }
        }

        if let Some(live) = this.live.as_mut() {
            match live.poll_next_unpin(cx) {
                Poll::Ready(Some(event)) => return Poll::Ready(Some(event)),
                Poll::Ready(None) => this.live = None,
                Poll::Pending => return Poll::Pending,
            }
        }

        if this.commands.is_none() && this.live.is_none() {
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }
}

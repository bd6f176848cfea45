//! Feedbacks
//!
//! A feedback is the only extension point for effectful behavior: timers,
//! fetches, reactions to particular state shapes. It observes the loop's
//! output stream and produces events that the loop reduces like any other
//! input.
//!
//! # Standard Shapes
//!
//! - [`Feedback::skipping_repeated`]: restart when a derived key changes,
//!   latest wins.
//! - [`Feedback::positive_edge_trigger`]: run while a predicate holds,
//!   started on the rising edge and cancelled on the falling edge.
//! - [`Feedback::system_bootstrapped`]: run once on the initial output.
//!
//! # Cancellation
//!
//! Effect instances are plain streams. Cancelling an instance drops it, so a
//! cancelled instance cannot emit again. Effects run on the tokio runtime
//! driving the loop's feedbacks, never on the loop's serial context; only
//! their events are marshalled onto it. Building a loop whose feedbacks
//! would be driven by a current-thread runtime on the loop's own context
//! fails with [`LoopError::RuntimeOnContext`](crate::LoopError).

mod combinators;
mod effect;
mod switch;

pub use effect::{Events, Feedback, Outputs};
pub use switch::{StartEffect, Switch, SwitchLatest};

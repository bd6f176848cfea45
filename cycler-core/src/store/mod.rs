//! State Container
//!
//! The [`FeedbackLoop`] owns the state and applies every input through the
//! reducer, one at a time, on its serial execution context. Its read surface
//! is a synchronous getter plus two hot streams:
//!
//! - outputs: every published `(state, input)` pair, starting with the
//!   current one;
//! - change notifications: a bare tick per published output, for consumers
//!   that re-read the state on notification.

mod feedback_loop;
mod subject;

pub use feedback_loop::{Builder, FeedbackLoop};
pub use subject::{CurrentValueSubject, PassthroughSubject};

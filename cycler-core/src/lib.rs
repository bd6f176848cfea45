//! Cycler Core
//!
//! A unidirectional state container. State changes only through a pure
//! reducer, which is driven by three kinds of input:
//!
//! - actions submitted by API consumers,
//! - direct field updates submitted by API consumers,
//! - events produced by feedbacks: standing effects that observe the
//!   container's own output stream.
//!
//! Every reduction runs on a single serial execution context, so the
//! published outputs are totally ordered and feedback events are always
//! reduced after the output that caused them.
//!
//! # Architecture
//!
//! - `model`: the [`Model`] trait, [`Input`], [`Output`] and [`FieldRef`]
//! - `context`: serial execution contexts the container is confined to
//! - `feedback`: the [`Feedback`] type and its standard shapes
//! - `store`: the [`FeedbackLoop`] container and its subjects
//!
//! # Example
//!
//! ```rust,ignore
//! use cycler_core::{ExecutionContext, Feedback, FeedbackLoop, Input, MainContext};
//!
//! let main = MainContext::new();
//! let counter = FeedbackLoop::new(
//!     Counter { count: 10, increment: 1, loading: false },
//!     reduce,
//!     vec![Feedback::positive_edge_trigger(
//!         |output| output.state.loading,
//!         |_| stream::once(async { CounterEvent::Loaded }),
//!     )],
//!     ExecutionContext::main(&main),
//! )?;
//!
//! counter.perform(CounterAction::Plus);
//! assert_eq!(counter.state().count, 11);
//!
//! // Events from feedbacks arrive on the main context when it is pumped.
//! main.run_pending();
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod feedback;
pub mod id;
pub mod model;
pub mod store;

pub use config::{ContextMode, LoopConfig};
pub use context::{ExecutionContext, Executor, Job, MainContext, WorkerContext};
pub use error::{LoopError, Result};
pub use feedback::{Events, Feedback, Outputs};
pub use id::LoopId;
pub use model::{FieldRef, Input, Model, Output};
pub use store::{Builder, FeedbackLoop};

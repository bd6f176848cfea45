//! Construction-time errors.
//!
//! Once a [`FeedbackLoop`](crate::FeedbackLoop) is running, its mutation
//! surface is fire-and-forget and surfaces no errors. Contract violations
//! (mutation off the confined context, reentrant reduction) are programmer
//! errors and panic instead of producing a value of this type.

use thiserror::Error;

/// Errors raised while configuring or building a feedback loop.
#[derive(Debug, Error)]
pub enum LoopError {
    /// Feedbacks were supplied but no tokio runtime was available to drive them.
    #[error("feedbacks require a tokio runtime; build inside a runtime or pass a handle")]
    NoRuntime,

    /// The configuration asked for the main context but none was supplied.
    #[error("context mode `main` requires a MainContext to be supplied")]
    MissingMainContext,

    /// Feedback effects would be driven by the same thread the loop reduces on.
    #[error("feedbacks would run on the loop's own context; drive them on another runtime thread")]
    RuntimeOnContext,

    /// A label or thread name contained an interior NUL byte.
    #[error("invalid name {0:?}: names must not contain NUL bytes")]
    InvalidName(String),

    /// The dedicated worker thread could not be started.
    #[error("failed to spawn worker context: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    /// The configuration document could not be parsed.
    #[error("invalid loop configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias for fallible construction.
pub type Result<T> = std::result::Result<T, LoopError>;

//! Feedback Loop
//!
//! The state container. It owns the current state, the reducer and the
//! serial execution context every reduction is confined to, and it drives
//! the feedbacks whose events flow back into the reducer.
//!
//! # Reduction Step
//!
//! 1. Clone the current state into a scratch value.
//! 2. For field updates, write the field into the scratch value.
//! 3. Run the reducer on the scratch value and the input.
//! 4. Publish `(scratch, input)` as the new output, then signal a change.
//!
//! Readers only ever see whole published states; the published state is
//! swapped, never mutated in place.
//!
//! # Ordering
//!
//! Inputs submitted on the loop's context run synchronously. Inputs
//! submitted elsewhere, including every feedback event, are posted to the
//! context and run in FIFO order. An event produced in reaction to an
//! output is therefore always reduced after that output was published.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::JoinHandle;

use super::subject::{CurrentValueSubject, PassthroughSubject};
use crate::config::{ContextMode, LoopConfig};
use crate::context::{ExecutionContext, MainContext, ReductionScope};
use crate::error::{LoopError, Result};
use crate::feedback::{Feedback, Outputs};
use crate::id::LoopId;
use crate::model::{FieldRef, Input, Model, Output};

type Reducer<M> = Box<dyn Fn(&mut M, &Input<M>) + Send + Sync>;

/// State shared between the loop handle, posted jobs and the feedback driver.
struct Core<M: Model> {
    id: LoopId,
    label: String,
    trace_inputs: bool,
    reduce: Reducer<M>,
    context: ExecutionContext,
    outputs: CurrentValueSubject<Output<M>>,
    changes: PassthroughSubject<()>,
    torn_down: AtomicBool,
}

impl<M: Model> Core<M> {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Run `input` on the loop's context: immediately if already there,
    /// otherwise as a posted job.
    fn process<W>(self: &Arc<Self>, input: Input<M>, will_reduce: W)
    where
        W: FnOnce(&mut M) + Send + 'static,
    {
        if self.is_torn_down() {
            tracing::warn!(
                loop_id = %self.id,
                label = %self.label,
                input = input.kind(),
                "input submitted after teardown ignored"
            );
            return;
        }

        if self.context.is_current() {
            self.execute(input, will_reduce);
            return;
        }

        tracing::trace!(loop_id = %self.id, input = input.kind(), "marshalling input onto context");
        let core = Arc::clone(self);
        let accepted = self
            .context
            .post(Box::new(move || core.execute(input, will_reduce)));

        if !accepted {
            tracing::warn!(
                loop_id = %self.id,
                label = %self.label,
                "execution context closed, input dropped"
            );
        }
    }

    fn execute<W>(&self, input: Input<M>, will_reduce: W)
    where
        W: FnOnce(&mut M),
    {
        assert!(
            self.context.is_current(),
            "{} reduced off its execution context",
            self.id
        );

        // Jobs queued before teardown are discarded.
        if self.is_torn_down() {
            tracing::trace!(
                loop_id = %self.id,
                input = input.kind(),
                "discarding queued input after teardown"
            );
            return;
        }

        let _scope = ReductionScope::enter(self.id);

        let mut state = self.outputs.value().state.clone();
        will_reduce(&mut state);
        (self.reduce)(&mut state, &input);

        if self.trace_inputs {
            tracing::debug!(
                loop_id = %self.id,
                label = %self.label,
                input = ?input,
                "reduced input"
            );
        }

        self.outputs.send(Output::new(state, Some(input)));
        self.changes.send(());
    }
}

/// A unidirectional state container driven by a reducer and feedbacks.
///
/// # Example
///
/// ```rust,ignore
/// let main = MainContext::new();
/// let counter = FeedbackLoop::new(
///     Counter { count: 10, increment: 1 },
///     |state: &mut Counter, input: &Input<Counter>| match input {
///         Input::Action(CounterAction::Plus) => state.count += state.increment,
///         Input::Action(CounterAction::Minus) => state.count -= state.increment,
///         _ => {}
///     },
///     vec![],
///     ExecutionContext::main(&main),
/// )?;
///
/// counter.perform(CounterAction::Plus);
/// assert_eq!(counter.state().count, 11);
/// ```
pub struct FeedbackLoop<M: Model> {
    core: Arc<Core<M>>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl<M: Model> FeedbackLoop<M> {
    /// Build a loop confined to `context`.
    ///
    /// Feedbacks are driven on the current tokio runtime; building with
    /// feedbacks outside a runtime fails with [`LoopError::NoRuntime`]. Use
    /// [`FeedbackLoop::builder`] to pass a runtime handle explicitly.
    pub fn new<R>(
        initial: M,
        reduce: R,
        feedbacks: Vec<Feedback<M>>,
        context: ExecutionContext,
    ) -> Result<Self>
    where
        R: Fn(&mut M, &Input<M>) + Send + Sync + 'static,
    {
        Self::builder(initial, reduce)
            .feedbacks(feedbacks)
            .context(context)
            .build()
    }

    pub fn builder<R>(initial: M, reduce: R) -> Builder<M>
    where
        R: Fn(&mut M, &Input<M>) + Send + Sync + 'static,
    {
        Builder {
            initial,
            reduce: Box::new(reduce),
            feedbacks: Vec::new(),
            context: None,
            main: None,
            runtime: None,
            config: LoopConfig::default(),
        }
    }

    pub fn id(&self) -> LoopId {
        self.core.id
    }

    pub fn label(&self) -> &str {
        &self.core.label
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.core.context
    }

    /// The most recently published state.
    pub fn state(&self) -> M {
        self.core.outputs.value().state.clone()
    }

    /// The most recently published output.
    pub fn output(&self) -> Output<M> {
        Output::clone(&self.core.outputs.value())
    }

    /// Borrow the most recently published state without cloning it.
    pub fn with_state<R, F>(&self, read: F) -> R
    where
        F: FnOnce(&M) -> R,
    {
        let output = self.core.outputs.value();
        read(&output.state)
    }

    /// Read one field of the most recently published state.
    pub fn get<U: Clone>(&self, field: FieldRef<M, U>) -> U {
        self.with_state(|state| field.get(state).clone())
    }

    /// Submit an action for reduction.
    pub fn perform(&self, action: M::Action) {
        self.core.process(Input::Action(action), |_| {});
    }

    /// Write `value` into `field` and reduce `Input::Updated` in the same
    /// step, so the reducer sees the written value and may still adjust it.
    pub fn update<U>(&self, value: U, field: FieldRef<M, U>)
    where
        U: Send + 'static,
    {
        self.core
            .process(Input::Updated(field.key()), move |state| field.set(state, value));
    }

    /// Stream of outputs, starting with the current one.
    ///
    /// Ends when the loop is torn down.
    pub fn subscribe_outputs(&self) -> Outputs<M> {
        self.core.outputs.subscribe()
    }

    /// Stream of states, starting with the current one.
    pub fn subscribe_states(&self) -> BoxStream<'static, M> {
        self.subscribe_outputs().map(|output| output.state).boxed()
    }

    /// Stream yielding once per output published after subscription.
    ///
    /// Ends when the loop is torn down.
    pub fn subscribe_change_notifications(&self) -> BoxStream<'static, ()> {
        self.core.changes.subscribe()
    }

    pub fn is_torn_down(&self) -> bool {
        self.core.is_torn_down()
    }

    /// Cancel every feedback, end both streams and release an owned context.
    ///
    /// Idempotent. Inputs submitted or still queued afterwards are ignored.
    pub fn teardown(&self) {
        if self.core.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(driver) = self.driver.lock().as_ref() {
            driver.abort();
        }

        self.core.outputs.finish();
        self.core.changes.finish();
        self.core.context.release();

        tracing::info!(
            loop_id = %self.core.id,
            label = %self.core.label,
            "feedback loop torn down"
        );
    }

    /// Tear down and wait until every feedback effect has been dropped.
    pub async fn shutdown(&self) {
        self.teardown();

        let driver = self.driver.lock().take();
        if let Some(driver) = driver {
            if let Err(err) = driver.await {
                if !err.is_cancelled() {
                    tracing::warn!(loop_id = %self.core.id, error = %err, "feedback driver failed");
                }
            }
        }
    }
}

impl<M: Model> Drop for FeedbackLoop<M> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<M: Model> fmt::Debug for FeedbackLoop<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedbackLoop")
            .field("id", &self.core.id)
            .field("label", &self.core.label)
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}

/// Step-by-step construction of a [`FeedbackLoop`].
pub struct Builder<M: Model> {
    initial: M,
    reduce: Reducer<M>,
    feedbacks: Vec<Feedback<M>>,
    context: Option<ExecutionContext>,
    main: Option<MainContext>,
    runtime: Option<Handle>,
    config: LoopConfig,
}

impl<M: Model> Builder<M> {
    pub fn feedback(mut self, feedback: Feedback<M>) -> Self {
        self.feedbacks.push(feedback);
        self
    }

    pub fn feedbacks<I>(mut self, feedbacks: I) -> Self
    where
        I: IntoIterator<Item = Feedback<M>>,
    {
        self.feedbacks.extend(feedbacks);
        self
    }

    /// Confine to an explicit context, overriding the configured mode.
    pub fn context(mut self, context: ExecutionContext) -> Self {
        self.context = Some(context);
        self
    }

    /// The main context used when the configured mode is `main`.
    pub fn main_context(mut self, main: &MainContext) -> Self {
        self.main = Some(main.clone());
        self
    }

    /// Drive feedbacks on this runtime instead of the current one.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.config.label = label.into();
        self
    }

    /// Build and start the loop.
    ///
    /// Fails with [`LoopError::RuntimeOnContext`] when the feedbacks would be
    /// driven by a current-thread runtime running on the loop's own context,
    /// such as a main-context loop built inside `#[tokio::test]`.
    pub fn build(self) -> Result<FeedbackLoop<M>> {
        self.config.validate()?;

        let runtime = match (self.feedbacks.is_empty(), self.runtime) {
            (true, _) => None,
            (false, Some(runtime)) => Some(runtime),
            (false, None) => Some(Handle::try_current().map_err(|_| LoopError::NoRuntime)?),
        };

        let context = match (self.context, self.config.context) {
            (Some(context), _) => context,
            (None, ContextMode::Main) => {
                let main = self.main.as_ref().ok_or(LoopError::MissingMainContext)?;
                ExecutionContext::main(main)
            }
            (None, ContextMode::Worker) => ExecutionContext::worker(self.config.thread_name())?,
        };

        if runtime.is_some() && context.is_current() && on_current_thread_runtime() {
            return Err(LoopError::RuntimeOnContext);
        }

        let core = Arc::new(Core {
            id: LoopId::new(),
            label: self.config.label,
            trace_inputs: self.config.trace_inputs,
            reduce: self.reduce,
            context,
            outputs: CurrentValueSubject::new(Output::new(self.initial, None)),
            changes: PassthroughSubject::new(),
            torn_down: AtomicBool::new(false),
        });

        tracing::info!(
            loop_id = %core.id,
            label = %core.label,
            feedbacks = self.feedbacks.len(),
            owned_context = core.context.is_owned(),
            "feedback loop started"
        );

        let driver = runtime.map(|runtime| spawn_driver(&core, self.feedbacks, &runtime));

        Ok(FeedbackLoop {
            core,
            driver: Mutex::new(driver),
        })
    }
}

/// Whether the calling thread is itself driving a current-thread runtime.
fn on_current_thread_runtime() -> bool {
    Handle::try_current()
        .is_ok_and(|handle| handle.runtime_flavor() == RuntimeFlavor::CurrentThread)
}

/// Subscribe every feedback before any input can be accepted, so each one
/// observes the initial output, then feed the merged events back in.
fn spawn_driver<M: Model>(
    core: &Arc<Core<M>>,
    feedbacks: Vec<Feedback<M>>,
    runtime: &Handle,
) -> JoinHandle<()> {
    let streams: Vec<_> = feedbacks
        .into_iter()
        .map(|feedback| {
            tracing::debug!(loop_id = %core.id, feedback = feedback.name(), "subscribing feedback");
            feedback.into_events(core.outputs.subscribe())
        })
        .collect();

    let mut events = stream::select_all(streams);
    let core = Arc::downgrade(core);

    runtime.spawn(async move {
        while let Some(event) = events.next().await {
            let Some(core) = core.upgrade() else {
                break;
            };
            core.process(Input::Event(event), |_| {});
        }
        tracing::trace!("feedback driver finished");
    })
}

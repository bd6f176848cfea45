//! Data Model
//!
//! The owner's state type implements [`Model`], which names the three kinds
//! of stimulus a loop accepts. Every stimulus is wrapped in an [`Input`];
//! every reduction step publishes an [`Output`] pairing the resulting state
//! with the input that produced it.
//!
//! # Field Updates
//!
//! Consumers may write a single field directly through [`FieldRef`], a typed
//! getter/setter pair tagged with the field's [`Model::Field`] discriminant.
//! The reducer sees the write as `Input::Updated(field)` in the same step, so
//! it can veto, adjust or augment the written value.

use std::fmt::{self, Debug};

/// A state type that can be driven by a [`FeedbackLoop`](crate::FeedbackLoop).
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone)]
/// struct Counter { count: i32, increment: i32 }
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum CounterField { Increment }
///
/// impl Model for Counter {
///     type Action = CounterAction;
///     type Event = CounterEvent;
///     type Field = CounterField;
/// }
/// ```
pub trait Model: Clone + Send + Sync + 'static {
    /// Commands issued by API consumers.
    type Action: Clone + Debug + Send + Sync + 'static;

    /// Values produced by feedback effects.
    type Event: Clone + Debug + Send + Sync + 'static;

    /// Discriminant naming a publicly writable field.
    type Field: Copy + Eq + Debug + Send + Sync + 'static;
}

/// One discrete stimulus accepted for reduction.
pub enum Input<M: Model> {
    /// A feedback has emitted an event.
    Event(M::Event),

    /// An API consumer has triggered an action.
    Action(M::Action),

    /// A publicly writable field has been overwritten by an API consumer.
    Updated(M::Field),
}

impl<M: Model> Input<M> {
    /// Short name of the variant, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Input::Event(_) => "event",
            Input::Action(_) => "action",
            Input::Updated(_) => "updated",
        }
    }
}

impl<M: Model> Clone for Input<M> {
    fn clone(&self) -> Self {
        match self {
            Input::Event(event) => Input::Event(event.clone()),
            Input::Action(action) => Input::Action(action.clone()),
            Input::Updated(field) => Input::Updated(*field),
        }
    }
}

impl<M: Model> Debug for Input<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Event(event) => f.debug_tuple("Event").field(event).finish(),
            Input::Action(action) => f.debug_tuple("Action").field(action).finish(),
            Input::Updated(field) => f.debug_tuple("Updated").field(field).finish(),
        }
    }
}

impl<M> PartialEq for Input<M>
where
    M: Model,
    M::Event: PartialEq,
    M::Action: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Input::Event(a), Input::Event(b)) => a == b,
            (Input::Action(a), Input::Action(b)) => a == b,
            (Input::Updated(a), Input::Updated(b)) => a == b,
            _ => false,
        }
    }
}

/// The state after having processed `input`.
///
/// `input` is `None` only for the initial output, published at construction
/// before any reduction has happened.
pub struct Output<M: Model> {
    /// The last processed input. `None` means the loop has just been spun up.
    pub input: Option<Input<M>>,

    /// The state after having processed `input`.
    pub state: M,
}

impl<M: Model> Output<M> {
    pub fn new(state: M, input: Option<Input<M>>) -> Self {
        Self { input, state }
    }

    /// Whether this is the loop's initial output.
    pub fn is_initial(&self) -> bool {
        self.input.is_none()
    }
}

impl<M: Model> Clone for Output<M> {
    fn clone(&self) -> Self {
        Self {
            input: self.input.clone(),
            state: self.state.clone(),
        }
    }
}

impl<M: Model + Debug> Debug for Output<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("input", &self.input)
            .field("state", &self.state)
            .finish()
    }
}

/// A typed accessor/mutator pair for one field of `M`.
///
/// # Example
///
/// ```rust,ignore
/// let increment = FieldRef::new(
///     CounterField::Increment,
///     |s: &Counter| &s.increment,
///     |s: &mut Counter, v| s.increment = v,
/// );
/// feedback_loop.update(5, &increment);
/// ```
pub struct FieldRef<M: Model, U> {
    key: M::Field,
    get: fn(&M) -> &U,
    set: fn(&mut M, U),
}

impl<M: Model, U> FieldRef<M, U> {
    pub fn new(key: M::Field, get: fn(&M) -> &U, set: fn(&mut M, U)) -> Self {
        Self { key, get, set }
    }

    /// The discriminant reported in `Input::Updated`.
    pub fn key(&self) -> M::Field {
        self.key
    }

    pub fn get<'a>(&self, state: &'a M) -> &'a U {
        (self.get)(state)
    }

    pub fn set(&self, state: &mut M, value: U) {
        (self.set)(state, value)
    }
}

impl<M: Model, U> Clone for FieldRef<M, U> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: Model, U> Copy for FieldRef<M, U> {}

impl<M: Model, U> Debug for FieldRef<M, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRef").field("key", &self.key).finish()
    }
}

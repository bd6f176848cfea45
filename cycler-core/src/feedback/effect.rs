//! The Feedback type.
//!
//! A feedback pairs the loop's output stream with the stream of events it
//! wants fed back into the reducer. It is consumed once, when the loop is
//! built, and lives exactly as long as the loop that owns it.

use std::fmt;

use futures_util::stream::{BoxStream, Stream, StreamExt};

use crate::model::{Model, Output};

/// The stream of outputs a feedback observes.
pub type Outputs<M> = BoxStream<'static, Output<M>>;

/// The stream of events a feedback produces.
pub type Events<M> = BoxStream<'static, <M as Model>::Event>;

type Effects<M> = Box<dyn FnOnce(Outputs<M>) -> Events<M> + Send>;

/// A standing effect that observes outputs and injects events.
///
/// # Example
///
/// ```rust,ignore
/// // Reload whenever the selected id changes; cancel the stale request.
/// let loader = Feedback::skipping_repeated(
///     |output: &Output<Browser>| output.state.selected,
///     |id| stream::once(fetch(id)),
/// );
/// ```
pub struct Feedback<M: Model> {
    name: &'static str,
    effects: Effects<M>,
}

impl<M: Model> Feedback<M> {
    /// Create a feedback from a raw transform of the output stream.
    ///
    /// The returned event stream must not fail; errors inside an effect are
    /// the effect author's to convert into events or silence.
    pub fn custom<F, S>(effects: F) -> Self
    where
        F: FnOnce(Outputs<M>) -> S + Send + 'static,
        S: Stream<Item = M::Event> + Send + 'static,
    {
        Self {
            name: "custom",
            effects: Box::new(move |outputs| effects(outputs).boxed()),
        }
    }

    /// Create a feedback observing bare states instead of outputs.
    pub fn from_states<F, S>(effects: F) -> Self
    where
        F: FnOnce(BoxStream<'static, M>) -> S + Send + 'static,
        S: Stream<Item = M::Event> + Send + 'static,
    {
        Self::custom(move |outputs: Outputs<M>| effects(outputs.map(|output| output.state).boxed()))
            .named("states")
    }

    /// Label this feedback in log output.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Subscribe the feedback to `outputs`, yielding its event stream.
    pub(crate) fn into_events(self, outputs: Outputs<M>) -> Events<M> {
        (self.effects)(outputs)
    }
}

impl<M: Model> fmt::Debug for Feedback<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feedback").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Input;
    use futures_util::stream;

    #[derive(Debug, Clone, PartialEq)]
    struct Level(u8);

    impl Model for Level {
        type Action = ();
        type Event = u8;
        type Field = ();
    }

    fn outputs(levels: Vec<u8>) -> Outputs<Level> {
        let mut first = true;
        stream::iter(levels)
            .map(move |level| {
                let input = if std::mem::take(&mut first) { None } else { Some(Input::Action(())) };
                Output::new(Level(level), input)
            })
            .boxed()
    }

    #[tokio::test]
    async fn custom_feedback_sees_outputs() {
        let feedback = Feedback::custom(|outputs: Outputs<Level>| {
            outputs.filter_map(|output| async move {
                (!output.is_initial()).then_some(output.state.0 * 10)
            })
        });

        let events: Vec<u8> = feedback.into_events(outputs(vec![1, 2, 3])).collect().await;
        assert_eq!(events, vec![20, 30]);
    }

    #[tokio::test]
    async fn state_feedback_sees_states() {
        let feedback = Feedback::from_states(|states: BoxStream<'static, Level>| {
            states.map(|state| state.0 + 1)
        });
        assert_eq!(feedback.name(), "states");

        let events: Vec<u8> = feedback.into_events(outputs(vec![4, 5])).collect().await;
        assert_eq!(events, vec![5, 6]);
    }

    #[test]
    fn debug_shows_name() {
        let feedback = Feedback::<Level>::custom(|_outputs| stream::empty()).named("noop");
        assert_eq!(format!("{feedback:?}"), r#"Feedback { name: "noop" }"#);
    }
}

//! Standard feedback shapes.
//!
//! Each combinator turns the output stream into a stream of [`Switch`]
//! commands and lets [`SwitchLatest`] run the effect instances, so at most
//! one instance per feedback is ever live and a replaced instance is dropped
//! before its successor is built.

use std::sync::Arc;

use futures_util::future;
use futures_util::stream::{self, Stream, StreamExt};

use super::effect::{Feedback, Outputs};
use super::switch::{StartEffect, Switch, SwitchLatest};
use crate::model::{Model, Output};

impl<M: Model> Feedback<M> {
    /// Re-run `effect` every time `transform` yields a value distinct from
    /// the last one it yielded.
    ///
    /// - A new non-`None` key cancels the live instance and starts a new one.
    /// - A `None` key cancels the live instance without a replacement.
    /// - An unchanged key (including repeated `None`s) does nothing.
    pub fn skipping_repeated<U, T, F, S>(transform: T, effect: F) -> Self
    where
        T: Fn(&Output<M>) -> Option<U> + Send + 'static,
        U: PartialEq + Clone + Send + 'static,
        F: Fn(U) -> S + Send + Sync + 'static,
        S: Stream<Item = M::Event> + Send + 'static,
    {
        let effect = Arc::new(effect);

        Feedback::custom(move |outputs: Outputs<M>| {
            let mut last: Option<Option<U>> = None;

            let commands = outputs.filter_map(move |output| {
                let key = transform(&output);
                let command = if last.as_ref() == Some(&key) {
                    None
                } else {
                    last = Some(key.clone());
                    Some(match key {
                        Some(key) => {
                            let effect = Arc::clone(&effect);
                            let start: StartEffect<M::Event> =
                                Box::new(move || effect(key).boxed());
                            Switch::Start(start)
                        }
                        None => Switch::Stop,
                    })
                };
                future::ready(command)
            });

            SwitchLatest::new(commands.boxed())
        })
        .named("skipping_repeated")
    }

    /// Start `effect` when `predicate` goes from false to true and cancel it
    /// when `predicate` goes back to false.
    ///
    /// The previous level starts out false. No transition is synthesized on
    /// subscription; the first observed output is compared against that
    /// false level like any other.
    pub fn positive_edge_trigger<P, F, S>(predicate: P, effect: F) -> Self
    where
        P: Fn(&Output<M>) -> bool + Send + 'static,
        F: Fn(Output<M>) -> S + Send + Sync + 'static,
        S: Stream<Item = M::Event> + Send + 'static,
    {
        let effect = Arc::new(effect);

        Feedback::custom(move |outputs: Outputs<M>| {
            let mut last = false;

            let commands = outputs.filter_map(move |output| {
                let current = predicate(&output);
                let command = match (std::mem::replace(&mut last, current), current) {
                    (false, true) => {
                        let effect = Arc::clone(&effect);
                        let start: StartEffect<M::Event> = Box::new(move || effect(output).boxed());
                        Some(Switch::Start(start))
                    }
                    (true, false) => Some(Switch::Stop),
                    (false, false) | (true, true) => None,
                };
                future::ready(command)
            });

            SwitchLatest::new(commands.boxed())
        })
        .named("positive_edge_trigger")
    }

    /// Run `effect` once, when the loop's initial output is observed.
    ///
    /// The output subscription is released as soon as the initial output has
    /// been seen; later outputs never restart the effect.
    pub fn system_bootstrapped<F, S>(effect: F) -> Self
    where
        F: FnOnce() -> S + Send + 'static,
        S: Stream<Item = M::Event> + Send + 'static,
    {
        Feedback::custom(move |mut outputs: Outputs<M>| {
            stream::once(async move {
                while let Some(output) = outputs.next().await {
                    if output.is_initial() {
                        return Some(effect);
                    }
                }
                None
            })
            .filter_map(future::ready)
            .flat_map(|start| start())
        })
        .named("system_bootstrapped")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    use crate::model::Input;

    #[derive(Debug, Clone, PartialEq)]
    struct Probe {
        key: Option<char>,
        loading: bool,
    }

    impl Model for Probe {
        type Action = ();
        type Event = String;
        type Field = ();
    }

    type Log = Arc<Mutex<Vec<String>>>;

    /// Records its own cancellation when dropped.
    struct Instance {
        log: Log,
        name: String,
    }

    impl Drop for Instance {
        fn drop(&mut self) {
            self.log.lock().push(format!("cancel {}", self.name));
        }
    }

    /// An effect instance that never completes on its own.
    fn standing(log: &Log, name: String) -> impl Stream<Item = String> + Send + 'static {
        log.lock().push(format!("start {name}"));
        let instance = Instance { log: log.clone(), name };
        stream::pending().map(move |event: String| {
            let _keep = &instance;
            event
        })
    }

    fn driven() -> (mpsc::UnboundedSender<Output<Probe>>, Outputs<Probe>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, UnboundedReceiverStream::new(rx).boxed())
    }

    fn output(key: Option<char>, loading: bool, initial: bool) -> Output<Probe> {
        let input = if initial { None } else { Some(Input::Action(())) };
        Output::new(Probe { key, loading }, input)
    }

    /// Poll the events stream until it stalls.
    async fn settle<S: Stream<Item = String> + Unpin>(events: &mut S) -> Vec<String> {
        let mut seen = Vec::new();
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_millis(20), events.next()).await
        {
            seen.push(event);
        }
        seen
    }

    #[tokio::test]
    async fn skipping_repeated_restarts_only_on_change() {
        let log: Log = Arc::default();
        let effect_log = log.clone();
        let feedback = Feedback::skipping_repeated(
            |output: &Output<Probe>| output.state.key,
            move |key| standing(&effect_log, key.to_string()),
        );

        let (tx, outputs) = driven();
        let mut events = feedback.into_events(outputs);

        for (i, key) in [Some('A'), Some('A'), Some('B'), None, Some('B')].into_iter().enumerate() {
            tx.send(output(key, false, i == 0)).unwrap();
        }
        settle(&mut events).await;

        assert_eq!(
            *log.lock(),
            vec!["start A", "cancel A", "start B", "cancel B", "start B"]
        );
    }

    #[tokio::test]
    async fn skipping_repeated_ignores_repeated_none() {
        let log: Log = Arc::default();
        let effect_log = log.clone();
        let feedback = Feedback::skipping_repeated(
            |output: &Output<Probe>| output.state.key,
            move |key| standing(&effect_log, key.to_string()),
        );

        let (tx, outputs) = driven();
        let mut events = feedback.into_events(outputs);

        for key in [None, None, Some('C'), None, None] {
            tx.send(output(key, false, false)).unwrap();
        }
        settle(&mut events).await;

        assert_eq!(*log.lock(), vec!["start C", "cancel C"]);
    }

    #[tokio::test]
    async fn cancelled_instance_never_emits() {
        let feedback = Feedback::skipping_repeated(
            |output: &Output<Probe>| output.state.key,
            |key| {
                let delay = if key == 'S' { 100 } else { 0 };
                stream::once(async move {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    format!("loaded {key}")
                })
            },
        );

        let (tx, outputs) = driven();
        let mut events = feedback.into_events(outputs);

        tx.send(output(Some('S'), false, true)).unwrap();
        assert!(settle(&mut events).await.is_empty());

        tx.send(output(Some('F'), false, false)).unwrap();
        let mut seen = Vec::new();
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_millis(250), events.next()).await
        {
            seen.push(event);
        }
        assert_eq!(seen, vec!["loaded F"]);
    }

    #[tokio::test]
    async fn positive_edge_trigger_follows_level() {
        let log: Log = Arc::default();
        let effect_log = log.clone();
        let feedback = Feedback::positive_edge_trigger(
            |output: &Output<Probe>| output.state.loading,
            move |output| {
                let name = format!("{}", output.state.key.unwrap_or('-'));
                standing(&effect_log, name)
            },
        );

        let (tx, outputs) = driven();
        let mut events = feedback.into_events(outputs);

        let levels = [false, true, true, false, true];
        for (i, loading) in levels.into_iter().enumerate() {
            let key = char::from_digit(i as u32, 10);
            tx.send(output(key, loading, i == 0)).unwrap();
        }
        settle(&mut events).await;

        assert_eq!(*log.lock(), vec!["start 1", "cancel 1", "start 4"]);
    }

    #[tokio::test]
    async fn positive_edge_trigger_fires_on_true_initial_output() {
        let feedback = Feedback::positive_edge_trigger(
            |output: &Output<Probe>| output.state.loading,
            |_output| stream::iter(vec!["loaded".to_string()]),
        );

        let (tx, outputs) = driven();
        let mut events = feedback.into_events(outputs);
        tx.send(output(None, true, true)).unwrap();

        assert_eq!(settle(&mut events).await, vec!["loaded"]);
    }

    #[tokio::test]
    async fn system_bootstrapped_runs_once() {
        let starts = Arc::new(Mutex::new(0));
        let counter = starts.clone();
        let feedback = Feedback::system_bootstrapped(move || {
            *counter.lock() += 1;
            stream::iter(vec!["restored".to_string()])
        });

        let (tx, outputs) = driven();
        let mut events = feedback.into_events(outputs);

        tx.send(output(None, false, true)).unwrap();
        for _ in 0..3 {
            let _ = tx.send(output(None, false, false));
        }

        assert_eq!(settle(&mut events).await, vec!["restored"]);
        assert_eq!(*starts.lock(), 1);

        // The output subscription has been released.
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn system_bootstrapped_waits_for_initial_output() {
        let feedback = Feedback::system_bootstrapped(|| stream::iter(vec!["restored".to_string()]));

        let (tx, outputs) = driven();
        let mut events = feedback.into_events(outputs);
        tx.send(output(None, false, false)).unwrap();

        assert!(settle(&mut events).await.is_empty());
    }
}

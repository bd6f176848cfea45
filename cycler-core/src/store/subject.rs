//! Subjects
//!
//! Hot multicast streams backing the loop's read surface.
//!
//! - [`CurrentValueSubject`] holds a current value. Each new subscriber first
//!   receives the current value, then every value sent afterwards.
//! - [`PassthroughSubject`] holds no value. Subscribers receive only values
//!   sent after they subscribed.
//!
//! Every subscriber has its own unbounded channel, so a slow subscriber never
//! loses values and never slows down the sender. Subscribers whose stream has
//! been dropped are pruned on the next send.
//!
//! Finishing a subject ends every live stream. Streams obtained after that
//! complete immediately.

use std::sync::Arc;

use futures_util::stream::{self, BoxStream, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

struct Subscribers<T> {
    senders: Vec<UnboundedSender<T>>,
    finished: bool,
}

impl<T: Clone + Send + 'static> Subscribers<T> {
    fn new() -> Self {
        Self {
            senders: Vec::new(),
            finished: false,
        }
    }

    fn broadcast(&mut self, value: &T) {
        self.senders.retain(|tx| tx.send(value.clone()).is_ok());
    }

    fn finish(&mut self) {
        self.finished = true;
        self.senders.clear();
    }
}

/// A multicast stream with a current value.
pub struct CurrentValueSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The current value, swapped whole on every send.
    value: RwLock<Arc<T>>,

    /// Held across swap-and-broadcast so subscribing never misses or
    /// duplicates a value.
    subscribers: Mutex<Subscribers<T>>,
}

impl<T> CurrentValueSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(Arc::new(value)),
            subscribers: Mutex::new(Subscribers::new()),
        }
    }

    /// The most recently sent value.
    pub fn value(&self) -> Arc<T> {
        Arc::clone(&self.value.read())
    }

    /// Replace the current value and deliver it to every subscriber.
    ///
    /// After the subject is finished the value is still stored but no longer
    /// delivered.
    pub fn send(&self, value: T) {
        let mut subscribers = self.subscribers.lock();
        *self.value.write() = Arc::new(value.clone());

        if !subscribers.finished {
            subscribers.broadcast(&value);
        }
    }

    /// Subscribe, starting with the current value.
    pub fn subscribe(&self) -> BoxStream<'static, T> {
        let mut subscribers = self.subscribers.lock();
        if subscribers.finished {
            return stream::empty().boxed();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let current = T::clone(&self.value.read());
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(current);
        subscribers.senders.push(tx);

        UnboundedReceiverStream::new(rx).boxed()
    }

    /// End every stream and refuse new subscribers.
    pub fn finish(&self) {
        self.subscribers.lock().finish();
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.subscribers.lock().finished
    }

    /// Number of live subscribers as of the last send.
    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.lock().senders.len()
    }
}

/// A multicast stream without a current value.
pub struct PassthroughSubject<T>
where
    T: Clone + Send + 'static,
{
    subscribers: Mutex<Subscribers<T>>,
}

impl<T> PassthroughSubject<T>
where
    T: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Subscribers::new()),
        }
    }

    pub fn send(&self, value: T) {
        let mut subscribers = self.subscribers.lock();
        if !subscribers.finished {
            subscribers.broadcast(&value);
        }
    }

    pub fn subscribe(&self) -> BoxStream<'static, T> {
        let mut subscribers = self.subscribers.lock();
        if subscribers.finished {
            return stream::empty().boxed();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        subscribers.senders.push(tx);
        UnboundedReceiverStream::new(rx).boxed()
    }

    pub fn finish(&self) {
        self.subscribers.lock().finish();
    }
}

impl<T> Default for PassthroughSubject<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

//! Stream plumbing shared by the engines
//!
//! - [`Relay`]: publish-only hub for UI events, late subscribers miss earlier events
//! - [`ReplayRelay`]: hub with a cached last value, subscribers get it first and then every
//!   later value
//! - [`distinct_until_changed`]: drops consecutive duplicates

use crate::lock;
use futures::stream::{self, BoxStream, StreamExt};
use futures::Stream;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::warn;

/// Events a relay buffers per subscriber before the slowest one starts lagging
const RELAY_CAPACITY: usize = 64;

/// Values a replay relay buffers per subscriber
const REPLAY_CAPACITY: usize = 256;

/// Receive until every sender is gone. Lagging subscribers skip ahead and log what they lost.
fn receive<T>(rx: broadcast::Receiver<T>, hub: &'static str) -> BoxStream<'static, T>
where
    T: Clone + Send + 'static,
{
    stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(value) => return Some((value, rx)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(hub, skipped, "Subscriber lagged, values dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}

/// Multi-subscriber event hub without a cached value
pub struct Relay<T> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> Relay<T> {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(RELAY_CAPACITY);
        Self { tx }
    }

    /// Publish an event to every live subscriber. Events with no subscriber are dropped.
    pub fn accept(&self, value: T) {
        let _ = self.tx.send(value);
    }

    /// Subscribe from this point on. The stream ends once every `Relay` handle is dropped.
    pub fn stream(&self) -> BoxStream<'static, T> {
        receive(self.tx.subscribe(), "relay")
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone + Send + 'static> Default for Relay<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Relay<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Multi-subscriber hub that caches the last published value
///
/// Publishing and subscribing happen under one lock, so a subscriber sees the cached value
/// followed by exactly the values published after it, none missed and none twice.
/// Subscriber streams end when every handle is dropped or the relay is closed.
pub struct ReplayRelay<T> {
    inner: Arc<Mutex<ReplayInner<T>>>,
}

struct ReplayInner<T> {
    latest: T,
    tx: Option<broadcast::Sender<T>>,
}

impl<T: Clone + Send + 'static> ReplayRelay<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = broadcast::channel(REPLAY_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(ReplayInner {
                latest: initial,
                tx: Some(tx),
            })),
        }
    }

    /// Cache `value` and hand it to every subscriber
    pub fn publish(&self, value: T) {
        let mut inner = lock(&self.inner);
        inner.latest = value.clone();
        if let Some(tx) = &inner.tx {
            let _ = tx.send(value);
        }
    }

    /// Publish only when `value` differs from the cached one. Returns whether it was published.
    pub fn publish_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        let mut inner = lock(&self.inner);
        if inner.latest == value {
            return false;
        }
        inner.latest = value.clone();
        if let Some(tx) = &inner.tx {
            let _ = tx.send(value);
        }
        true
    }

    pub fn latest(&self) -> T {
        lock(&self.inner).latest.clone()
    }

    /// Cached value, then every later value
    pub fn stream(&self) -> BoxStream<'static, T> {
        let (latest, rx) = {
            let inner = lock(&self.inner);
            (inner.latest.clone(), inner.tx.as_ref().map(broadcast::Sender::subscribe))
        };
        let cached = stream::once(futures::future::ready(latest));
        match rx {
            Some(rx) => cached.chain(receive(rx, "replay")).boxed(),
            None => cached.boxed(),
        }
    }

    /// End every subscriber stream. The cached value stays readable.
    pub fn close(&self) {
        lock(&self.inner).tx.take();
    }
}

impl<T> Clone for ReplayRelay<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Forward an item only when it differs from the previously forwarded one
pub fn distinct_until_changed<S>(source: S) -> BoxStream<'static, S::Item>
where
    S: Stream + Send + 'static,
    S::Item: PartialEq + Clone + Send + 'static,
{
    source
        .scan(None, |last: &mut Option<S::Item>, item| {
            let changed = last.as_ref() != Some(&item);
            if changed {
                *last = Some(item.clone());
            }
            futures::future::ready(Some(changed.then_some(item)))
        })
        .filter_map(futures::future::ready)
        .boxed()
}

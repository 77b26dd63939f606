//! Feedback-loop state engine
//!
//! A [`System`] owns one authoritative state value. Actions from external callers and from
//! feedbacks are queued on a single channel and folded through the reducer one at a time.
//! After every reduction the new state is published to subscribers and handed to every
//! feedback, which may queue further actions. Actions queued while a state is being
//! processed are applied afterwards, so a chain of synchronous reactions settles one action
//! at a time without reentering the reducer.
//!
//! Every reduced state is published twice: on a `watch` channel for readers that only need
//! the latest value, and on a [`ReplayRelay`] for [`System::stream`] subscribers, which
//! receive every state in order however far behind they are.
//!
//! The loop is cold: nothing runs until the first call to [`System::subscribe`] (or
//! [`System::stream`] / [`System::start`]). All subscribers share the same loop.

use crate::{lock, stream::ReplayRelay, Error, Result};
use futures::stream::BoxStream;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Pure `(state, action) -> state` fold
pub type Reducer<S, A> = Box<dyn Fn(&S, A) -> S + Send + Sync>;

/// Derives actions from the authoritative state
///
/// `observe` runs on the engine task right after each reduction (and once with the initial
/// state when the loop starts). It must not block. Long-running work belongs in a spawned
/// effect that sends its result through the [`ActionSink`].
pub trait Feedback<S, A>: Send {
    fn observe(&mut self, state: &S, actions: &ActionSink<A>);
}

impl<S, A, F> Feedback<S, A> for F
where
    F: FnMut(&S, &ActionSink<A>) + Send,
{
    fn observe(&mut self, state: &S, actions: &ActionSink<A>) {
        self(state, actions)
    }
}

/// Generation stamp of an effect. Actions carrying a stale ticket are discarded.
#[derive(Debug, Clone)]
pub(crate) struct Ticket {
    current: Arc<AtomicU64>,
    issued: u64,
}

impl Ticket {
    pub(crate) fn new(current: Arc<AtomicU64>) -> Self {
        let issued = current.load(Ordering::Acquire);
        Self { current, issued }
    }

    fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.issued
    }
}

struct Envelope<A> {
    action: A,
    ticket: Option<Ticket>,
}

/// Handle for queueing actions into a running system
pub struct ActionSink<A> {
    tx: mpsc::UnboundedSender<Envelope<A>>,
    ticket: Option<Ticket>,
}

impl<A> ActionSink<A> {
    /// Queue an action. Returns false once the engine has shut down.
    pub fn send(&self, action: A) -> bool {
        self.tx
            .send(Envelope {
                action,
                ticket: self.ticket.clone(),
            })
            .is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Sink whose actions are dropped once `ticket` is superseded
    pub(crate) fn ticketed(&self, ticket: Ticket) -> Self {
        Self {
            tx: self.tx.clone(),
            ticket: Some(ticket),
        }
    }
}

impl<A> Clone for ActionSink<A> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            ticket: self.ticket.clone(),
        }
    }
}

/// Builder for a [`System`]
pub struct SystemBuilder<S, A> {
    name: &'static str,
    initial: S,
    reduce: Reducer<S, A>,
    feedbacks: Vec<Box<dyn Feedback<S, A>>>,
}

impl<S, A> SystemBuilder<S, A>
where
    S: Clone + Debug + Send + Sync + 'static,
    A: Debug + Send + 'static,
{
    /// Append a feedback. Feedbacks observe each state in the order they were added.
    pub fn feedback(mut self, feedback: impl Feedback<S, A> + 'static) -> Self {
        self.feedbacks.push(Box::new(feedback));
        self
    }

    pub fn build(self) -> System<S, A> {
        let (state_tx, state_rx) = watch::channel(self.initial.clone());
        let states = ReplayRelay::new(self.initial.clone());
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let sink = ActionSink {
            tx: action_tx,
            ticket: None,
        };

        let driver = Driver {
            name: self.name,
            state: self.initial,
            reduce: self.reduce,
            feedbacks: self.feedbacks,
            actions: action_rx,
            sink: sink.clone(),
            state_tx,
            states: states.clone(),
        };

        System {
            name: self.name,
            state_rx,
            states,
            sink,
            driver: Mutex::new(Some(driver)),
            task: Mutex::new(None),
        }
    }
}

/// Running (or not yet started) feedback loop
pub struct System<S, A> {
    name: &'static str,
    state_rx: watch::Receiver<S>,
    states: ReplayRelay<S>,
    sink: ActionSink<A>,
    driver: Mutex<Option<Driver<S, A>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<S, A> System<S, A>
where
    S: Clone + Debug + Send + Sync + 'static,
    A: Debug + Send + 'static,
{
    /// Start describing a system with its initial state and reducer
    pub fn builder(
        name: &'static str,
        initial: S,
        reduce: impl Fn(&S, A) -> S + Send + Sync + 'static,
    ) -> SystemBuilder<S, A> {
        SystemBuilder {
            name,
            initial,
            reduce: Box::new(reduce),
            feedbacks: Vec::new(),
        }
    }

    /// Spawn the loop if it is not running yet. Must be called within a Tokio runtime.
    pub fn start(&self) {
        let Some(driver) = lock(&self.driver).take() else {
            return;
        };
        *lock(&self.task) = Some(tokio::spawn(driver.run()));
    }

    pub fn is_started(&self) -> bool {
        lock(&self.driver).is_none()
    }

    /// Receiver of the authoritative state, starting the loop if needed
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.start();
        self.state_rx.clone()
    }

    /// Replayed state stream: the current state first, then every later state
    pub fn stream(&self) -> BoxStream<'static, S> {
        self.start();
        self.states.stream()
    }

    /// Current state without subscribing
    pub fn state(&self) -> S {
        self.state_rx.borrow().clone()
    }

    /// Queue an action from outside the loop
    pub fn send(&self, action: A) -> Result<()> {
        if self.sink.send(action) {
            Ok(())
        } else {
            Err(Error::EngineClosed)
        }
    }

    /// Sink for external producers
    pub fn actions(&self) -> ActionSink<A> {
        self.sink.clone()
    }
}

impl<S, A> Drop for System<S, A> {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.task).take() {
            debug!(system = self.name, "Stopping feedback loop");
            task.abort();
        }
    }
}

struct Driver<S, A> {
    name: &'static str,
    state: S,
    reduce: Reducer<S, A>,
    feedbacks: Vec<Box<dyn Feedback<S, A>>>,
    actions: mpsc::UnboundedReceiver<Envelope<A>>,
    sink: ActionSink<A>,
    state_tx: watch::Sender<S>,
    states: ReplayRelay<S>,
}

impl<S, A> Driver<S, A>
where
    S: Clone + Debug + Send + Sync + 'static,
    A: Debug + Send + 'static,
{
    async fn run(mut self) {
        info!(
            system = self.name,
            feedbacks = self.feedbacks.len(),
            "Feedback loop started"
        );
        self.notify_feedbacks();

        while let Some(envelope) = self.actions.recv().await {
            if let Some(ticket) = &envelope.ticket {
                if !ticket.is_current() {
                    trace!(system = self.name, action = ?envelope.action, "Dropped action of superseded effect");
                    continue;
                }
            }

            debug!(system = self.name, action = ?envelope.action, "Applying action");
            self.state = (self.reduce)(&self.state, envelope.action);
            self.state_tx.send_replace(self.state.clone());
            self.states.publish(self.state.clone());
            self.notify_feedbacks();
        }
    }

    fn notify_feedbacks(&mut self) {
        for feedback in &mut self.feedbacks {
            feedback.observe(&self.state, &self.sink);
        }
    }
}

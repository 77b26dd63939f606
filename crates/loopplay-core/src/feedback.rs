//! Feedback building blocks
//!
//! - [`bind`]: forward an external action stream into the loop
//! - [`bind_latest`]: map each external event to an effect, only the latest effect survives
//! - [`react`]: derive a request from state and run one effect per distinct request
//!
//! Effects are streams of actions run on their own task. Superseding an effect aborts its
//! task and bumps its generation, so anything it already queued is discarded by the engine.

use crate::system::{ActionSink, Feedback, Ticket};
use futures::stream::{self, BoxStream, StreamExt};
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Effect that emits `action` after `delay`
pub fn after<A: Send + 'static>(delay: Duration, action: A) -> BoxStream<'static, A> {
    stream::once(async move {
        tokio::time::sleep(delay).await;
        action
    })
    .boxed()
}

/// Effect that emits `action` right away
pub fn just<A: Send + 'static>(action: A) -> BoxStream<'static, A> {
    stream::once(futures::future::ready(action)).boxed()
}

/// At most one running effect, identified by a generation counter
struct EffectSlot {
    name: &'static str,
    generation: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl EffectSlot {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            generation: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!(feedback = self.name, "Cancelling superseded effect");
            }
            task.abort();
        }
    }

    fn start<A: Send + 'static>(&mut self, mut effect: BoxStream<'static, A>, actions: &ActionSink<A>) {
        self.cancel();
        let actions = actions.ticketed(Ticket::new(self.generation.clone()));
        self.task = Some(tokio::spawn(async move {
            while let Some(action) = effect.next().await {
                if !actions.send(action) {
                    break;
                }
            }
        }));
    }
}

impl Drop for EffectSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

// =============================================================================
// bind
// =============================================================================

/// Feedback that ignores state and forwards `source` once the loop starts
pub struct Bind<A> {
    source: Option<BoxStream<'static, A>>,
    task: Option<JoinHandle<()>>,
}

pub fn bind<A: Send + 'static>(source: BoxStream<'static, A>) -> Bind<A> {
    Bind {
        source: Some(source),
        task: None,
    }
}

impl<S, A: Send + 'static> Feedback<S, A> for Bind<A> {
    fn observe(&mut self, _state: &S, actions: &ActionSink<A>) {
        let Some(mut source) = self.source.take() else {
            return;
        };
        let actions = actions.clone();
        self.task = Some(tokio::spawn(async move {
            while let Some(action) = source.next().await {
                if !actions.send(action) {
                    break;
                }
            }
        }));
    }
}

impl<A> Drop for Bind<A> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// =============================================================================
// bind_latest
// =============================================================================

type EffectFn<T, A> = Box<dyn Fn(T) -> BoxStream<'static, A> + Send + Sync>;

/// Feedback that switches to a new effect for every event of `source`
pub struct BindLatest<T, A> {
    name: &'static str,
    source: Option<BoxStream<'static, T>>,
    effects: Option<EffectFn<T, A>>,
    task: Option<JoinHandle<()>>,
}

pub fn bind_latest<T, A>(
    name: &'static str,
    source: BoxStream<'static, T>,
    effects: impl Fn(T) -> BoxStream<'static, A> + Send + Sync + 'static,
) -> BindLatest<T, A> {
    BindLatest {
        name,
        source: Some(source),
        effects: Some(Box::new(effects)),
        task: None,
    }
}

impl<S, T, A> Feedback<S, A> for BindLatest<T, A>
where
    T: Send + 'static,
    A: Send + 'static,
{
    fn observe(&mut self, _state: &S, actions: &ActionSink<A>) {
        let (Some(mut source), Some(effects)) = (self.source.take(), self.effects.take()) else {
            return;
        };
        let actions = actions.clone();
        let mut slot = EffectSlot::new(self.name);
        self.task = Some(tokio::spawn(async move {
            while let Some(event) = source.next().await {
                if actions.is_closed() {
                    break;
                }
                slot.start(effects(event), &actions);
            }
        }));
    }
}

impl<T, A> Drop for BindLatest<T, A> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// =============================================================================
// react
// =============================================================================

/// Feedback running one effect per distinct request derived from state
///
/// While `request` keeps returning an equal value the running effect is left alone, even if
/// the state is re-emitted many times. A different value (or `None`) cancels it.
pub struct React<S, R, A> {
    name: &'static str,
    request: Box<dyn Fn(&S) -> Option<R> + Send + Sync>,
    effects: EffectFn<R, A>,
    current: Option<R>,
    slot: EffectSlot,
}

pub fn react<S, R, A>(
    name: &'static str,
    request: impl Fn(&S) -> Option<R> + Send + Sync + 'static,
    effects: impl Fn(R) -> BoxStream<'static, A> + Send + Sync + 'static,
) -> React<S, R, A> {
    React {
        name,
        request: Box::new(request),
        effects: Box::new(effects),
        current: None,
        slot: EffectSlot::new(name),
    }
}

impl<S, R, A> Feedback<S, A> for React<S, R, A>
where
    R: Clone + PartialEq + Debug + Send,
    A: Send + 'static,
{
    fn observe(&mut self, state: &S, actions: &ActionSink<A>) {
        let request = (self.request)(state);
        if request == self.current {
            return;
        }

        self.slot.cancel();
        debug!(feedback = self.name, from = ?self.current, to = ?request, "Request changed");
        self.current = request.clone();
        if let Some(request) = request {
            self.slot.start((self.effects)(request), actions);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Relay;
    use crate::system::System;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Countdown {
        Idle,
        Showing(u32),
        Done,
    }

    #[derive(Debug, Clone, Copy)]
    enum Tick {
        Set(u32),
        Left(u32),
        Finish,
    }

    fn reduce(_: &Countdown, action: Tick) -> Countdown {
        match action {
            Tick::Set(n) | Tick::Left(n) => Countdown::Showing(n),
            Tick::Finish => Countdown::Done,
        }
    }

    type Recorder = Arc<std::sync::Mutex<Vec<Countdown>>>;

    fn countdown_system(starts: Arc<AtomicUsize>, seen: Recorder) -> System<Countdown, Tick> {
        System::builder("countdown", Countdown::Idle, reduce)
            .feedback(move |state: &Countdown, _: &ActionSink<Tick>| {
                seen.lock().unwrap().push(*state);
            })
            .feedback(react(
                "tick",
                |state: &Countdown| match state {
                    Countdown::Showing(n) => Some(*n),
                    _ => None,
                },
                move |n: u32| {
                    starts.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        just(Tick::Finish)
                    } else {
                        after(Duration::from_secs(1), Tick::Left(n - 1))
                    }
                },
            ))
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn test_react_counts_down_once_per_value() {
        let starts = Arc::new(AtomicUsize::new(0));
        let seen = Recorder::default();
        let system = countdown_system(starts.clone(), seen.clone());
        let mut rx = system.subscribe();
        system.send(Tick::Set(3)).unwrap();
        rx.wait_for(|s| *s == Countdown::Done).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                Countdown::Idle,
                Countdown::Showing(3),
                Countdown::Showing(2),
                Countdown::Showing(1),
                Countdown::Showing(0),
                Countdown::Done,
            ]
        );
        assert_eq!(starts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_react_changed_request_cancels_pending_effect() {
        let starts = Arc::new(AtomicUsize::new(0));
        let system = countdown_system(starts.clone(), Recorder::default());
        let _rx = system.subscribe();

        system.send(Tick::Set(5)).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        system.send(Tick::Set(8)).unwrap();
        tokio::time::sleep(Duration::from_millis(1200)).await;

        // the tick for 5 would have landed at 1.0s, the tick for 8 lands at 1.3s
        assert_eq!(system.state(), Countdown::Showing(7));
        assert_eq!(starts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_react_equal_request_keeps_running_effect() {
        let starts = Arc::new(AtomicUsize::new(0));
        let system = countdown_system(starts.clone(), Recorder::default());
        let _rx = system.subscribe();

        system.send(Tick::Set(4)).unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        // same request value re-emitted
        system.send(Tick::Set(4)).unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(system.state(), Countdown::Showing(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bind_latest_keeps_only_latest_effect() {
        let events = Relay::new();
        let system = System::builder("debounce", 0u32, |state: &u32, n: u32| state + n)
            .feedback(bind_latest("delayed", events.stream(), |n: u32| {
                after(Duration::from_secs(2), n)
            }))
            .build();
        let _rx = system.subscribe();

        events.accept(1);
        tokio::time::sleep(Duration::from_secs(1)).await;
        events.accept(10);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(system.state(), 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(system.state(), 10);
    }

    #[tokio::test]
    async fn test_bind_forwards_source() {
        let system = System::builder("bound", 0u32, |state: &u32, n: u32| state + n)
            .feedback(bind(stream::iter(vec![1, 2, 3]).boxed()))
            .build();
        let mut rx = system.subscribe();

        let total = *rx.wait_for(|s| *s == 6).await.unwrap();
        assert_eq!(total, 6);
    }
}

//! Playback clock contract and an in-process implementation
//!
//! The engines never talk to a media framework directly. They consume a [`PlaybackClock`]:
//! a periodic time stream, a playing/paused stream and an asynchronous seek.
//!
//! [`SimulatedClock`] backs the CLI and the tests. One ticker task serves every time
//! subscriber; it starts with the first subscriber and stops when the last one is dropped.
//! A newer seek supersedes one still in flight, and a detached clock ends its streams and
//! refuses further seeks.

use crate::{lock, stream::ReplayRelay, Error, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Time samples a subscriber may fall behind by before older ones are dropped
const TIME_CAPACITY: usize = 32;

/// Media clock the engines observe and control
#[async_trait]
pub trait PlaybackClock: Send + Sync {
    /// Current media time, sampled periodically whether or not playback is running
    fn observe_time(&self) -> BoxStream<'static, Duration>;

    /// Playing status, starting with the current value
    fn observe_playing_status(&self) -> BoxStream<'static, bool>;

    /// Seek and wait for the seek to land
    async fn seek(&self, to: Duration) -> Result<()>;

    fn play(&self);

    fn pause(&self);

    fn current_time(&self) -> Duration;
}

/// Simulated clock configuration
#[derive(Debug, Clone)]
pub struct SimulatedClockConfig {
    /// Wall-clock period between time samples
    pub tick_interval: Duration,
    /// Media time added per sample while playing
    pub advance_per_tick: Duration,
    /// Time a seek takes to complete
    pub seek_latency: Duration,
    /// Media length. Playback pauses when it is reached.
    pub duration: Option<Duration>,
    /// Initial media position
    pub start_position: Duration,
}

impl Default for SimulatedClockConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            advance_per_tick: Duration::from_secs(1),
            seek_latency: Duration::from_millis(250),
            duration: None,
            start_position: Duration::ZERO,
        }
    }
}

/// In-process playback clock
#[derive(Clone)]
pub struct SimulatedClock {
    inner: Arc<ClockInner>,
}

struct ClockInner {
    config: SimulatedClockConfig,
    position: Mutex<Duration>,
    playing: ReplayRelay<bool>,
    time_tx: Mutex<Option<broadcast::Sender<Duration>>>,
    ticker: Mutex<Ticker>,
    seek_generation: AtomicU64,
    detached: AtomicBool,
    failing_seeks: AtomicU32,
    seek_log: Mutex<Vec<Duration>>,
}

#[derive(Default)]
struct Ticker {
    subscribers: usize,
    task: Option<JoinHandle<()>>,
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl SimulatedClock {
    pub fn new(config: SimulatedClockConfig) -> Self {
        let (time_tx, _) = broadcast::channel(TIME_CAPACITY);
        Self {
            inner: Arc::new(ClockInner {
                position: Mutex::new(config.start_position),
                config,
                playing: ReplayRelay::new(false),
                time_tx: Mutex::new(Some(time_tx)),
                ticker: Mutex::new(Ticker::default()),
                seek_generation: AtomicU64::new(0),
                detached: AtomicBool::new(false),
                failing_seeks: AtomicU32::new(0),
                seek_log: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Make the next `count` seeks fail
    pub fn fail_next_seeks(&self, count: u32) {
        self.inner.failing_seeks.store(count, Ordering::SeqCst);
    }

    /// Targets of every seek issued so far
    pub fn seek_log(&self) -> Vec<Duration> {
        lock(&self.inner.seek_log).clone()
    }

    /// Live time subscribers sharing the ticker
    pub fn time_subscribers(&self) -> usize {
        lock(&self.inner.ticker).subscribers
    }

    pub fn is_ticking(&self) -> bool {
        lock(&self.inner.ticker).task.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.playing.latest()
    }

    /// Detach the media, as when the player item goes away
    ///
    /// Every time and playing-status stream ends, the ticker stops, and seeks (including
    /// one in flight) fail with [`Error::ClockUnavailable`].
    pub fn detach(&self) {
        if self.inner.detached.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(position = ?self.current_time(), "Clock detached");
        lock(&self.inner.time_tx).take();
        if let Some(task) = lock(&self.inner.ticker).task.take() {
            task.abort();
        }
        self.inner.playing.close();
    }

    pub fn is_detached(&self) -> bool {
        self.inner.detached.load(Ordering::SeqCst)
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new(SimulatedClockConfig::default())
    }
}

impl ClockInner {
    fn clamp(&self, target: Duration) -> Duration {
        match self.config.duration {
            Some(duration) => target.min(duration),
            None => target,
        }
    }

    /// Advance the position by one tick if playing and return the sample to publish
    fn sample(&self, advance: bool) -> Duration {
        let mut position = lock(&self.position);
        if advance && self.playing.latest() {
            *position = self.clamp(*position + self.config.advance_per_tick);
            if Some(*position) == self.config.duration {
                info!(position = ?*position, "Reached end of media");
                self.playing.publish_if_changed(false);
            }
        }
        *position
    }

    fn emit(&self, time: Duration) {
        if let Some(tx) = lock(&self.time_tx).as_ref() {
            let _ = tx.send(time);
        }
    }
}

/// Keeps the shared ticker alive for one time subscriber
struct TickerLease {
    clock: Weak<ClockInner>,
}

impl TickerLease {
    fn acquire(inner: &Arc<ClockInner>) -> Self {
        let mut ticker = lock(&inner.ticker);
        ticker.subscribers += 1;
        if ticker.task.is_none() {
            debug!("Starting shared time observer");
            ticker.task = Some(tokio::spawn(run_ticker(
                Arc::downgrade(inner),
                inner.config.tick_interval,
            )));
        }
        Self {
            clock: Arc::downgrade(inner),
        }
    }
}

impl Drop for TickerLease {
    fn drop(&mut self) {
        let Some(inner) = self.clock.upgrade() else {
            return;
        };
        let mut ticker = lock(&inner.ticker);
        ticker.subscribers = ticker.subscribers.saturating_sub(1);
        if ticker.subscribers == 0 {
            if let Some(task) = ticker.task.take() {
                debug!("Releasing shared time observer");
                task.abort();
            }
        }
    }
}

async fn run_ticker(clock: Weak<ClockInner>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut first = true;
    loop {
        interval.tick().await;
        let Some(inner) = clock.upgrade() else {
            break;
        };
        let now = inner.sample(!first);
        first = false;
        inner.emit(now);
    }
}

#[async_trait]
impl PlaybackClock for SimulatedClock {
    fn observe_time(&self) -> BoxStream<'static, Duration> {
        let Some(rx) = lock(&self.inner.time_tx).as_ref().map(broadcast::Sender::subscribe) else {
            return stream::empty().boxed();
        };
        let lease = TickerLease::acquire(&self.inner);
        stream::unfold((rx, lease), |(mut rx, lease)| async move {
            loop {
                match rx.recv().await {
                    Ok(time) => return Some((time, (rx, lease))),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }

    fn observe_playing_status(&self) -> BoxStream<'static, bool> {
        self.inner.playing.stream()
    }

    async fn seek(&self, to: Duration) -> Result<()> {
        if self.is_detached() {
            return Err(Error::ClockUnavailable);
        }
        let target = self.inner.clamp(to);
        let generation = self.inner.seek_generation.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.inner.seek_log).push(target);
        debug!(target = ?target, "Seek requested");

        tokio::time::sleep(self.inner.config.seek_latency).await;

        if self.is_detached() {
            return Err(Error::ClockUnavailable);
        }
        if self.inner.seek_generation.load(Ordering::SeqCst) != generation {
            debug!(target = ?target, "Seek superseded");
            return Err(Error::SeekCancelled);
        }
        let failing = self
            .inner
            .failing_seeks
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(Error::seek_failed(target, "simulated seek failure"));
        }

        *lock(&self.inner.position) = target;
        self.inner.emit(target);
        Ok(())
    }

    fn play(&self) {
        if !self.is_detached() {
            self.inner.playing.publish_if_changed(true);
        }
    }

    fn pause(&self) {
        if !self.is_detached() {
            self.inner.playing.publish_if_changed(false);
        }
    }

    fn current_time(&self) -> Duration {
        *lock(&self.inner.position)
    }
}

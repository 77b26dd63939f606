//! Skip-intro countdown and seek orchestration
//!
//! Three feedbacks drive the reducer:
//! 1. intro-start detector: clock time crossing `intro_start`, de-duplicated
//! 2. countdown: one delayed tick per distinct `Showing(n)`
//! 3. skip executor: one seek to `intro_end` per entry into `Skipping`, held on screen for
//!    `skip_hold` once it lands

use crate::clock::PlaybackClock;
use crate::config::{CountdownMode, PlayerConfig, SeekFailurePolicy};
use crate::feedback::{after, bind, just, react};
use crate::stream::distinct_until_changed;
use crate::system::System;
use crate::types::{SkipIntroAction, SkipIntroState};
use crate::Error;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Skip-intro reducer for a countdown of `countdown` ticks
pub fn reducer(
    countdown: u32,
    mode: CountdownMode,
) -> impl Fn(&SkipIntroState, SkipIntroAction) -> SkipIntroState + Send + Sync + 'static {
    move |_state: &SkipIntroState, action: SkipIntroAction| match action {
        SkipIntroAction::DidSkipIntro | SkipIntroAction::SkipFailed => SkipIntroState::Hidden,
        SkipIntroAction::StartSkippingIntro => SkipIntroState::Skipping,
        SkipIntroAction::HasIntroStarted(true) => SkipIntroState::Showing {
            seconds_left: countdown,
        },
        SkipIntroAction::HasIntroStarted(false) => SkipIntroState::Hidden,
        SkipIntroAction::SecondsLeftChanged(0) if mode == CountdownMode::ReducerDriven => {
            SkipIntroState::Skipping
        }
        SkipIntroAction::SecondsLeftChanged(seconds_left) => SkipIntroState::Showing { seconds_left },
    }
}

/// Whether playback is past `intro_start`, emitted only on change
pub fn has_intro_started(
    time: BoxStream<'static, Duration>,
    intro_start: Duration,
) -> BoxStream<'static, bool> {
    distinct_until_changed(time.map(move |now| now > intro_start))
}

/// Countdown effect for `Showing(seconds_left)`
fn countdown_tick(
    seconds_left: u32,
    tick: Duration,
    mode: CountdownMode,
) -> BoxStream<'static, SkipIntroAction> {
    match mode {
        CountdownMode::FeedbackDriven if seconds_left == 0 => {
            just(SkipIntroAction::StartSkippingIntro)
        }
        _ => after(
            tick,
            SkipIntroAction::SecondsLeftChanged(seconds_left.saturating_sub(1)),
        ),
    }
}

/// Seek past the intro, applying the failure policy
fn skip_seek(clock: Arc<dyn PlaybackClock>, plan: SkipPlan) -> BoxStream<'static, SkipIntroAction> {
    let SkipPlan {
        target,
        hold,
        policy,
        retry_attempts,
        retry_delay,
    } = plan;
    stream::once(async move {
        let mut attempt = 0;
        loop {
            let err = match clock.seek(target).await {
                Ok(()) => {
                    info!(target = ?target, "Skipped intro");
                    tokio::time::sleep(hold).await;
                    return Some(SkipIntroAction::DidSkipIntro);
                }
                // someone else moved the playhead, the intro detector takes it from here
                Err(Error::SeekCancelled) => {
                    info!(target = ?target, "Skip-intro seek superseded");
                    return Some(SkipIntroAction::SkipFailed);
                }
                Err(err) => err,
            };
            warn!(
                target = ?target,
                attempt,
                code = err.error_code(),
                error = %err,
                "Skip-intro seek failed"
            );

            match policy {
                SeekFailurePolicy::Stay => return None,
                SeekFailurePolicy::Retry if attempt < retry_attempts && err.is_recoverable() => {
                    attempt += 1;
                    tokio::time::sleep(retry_delay).await;
                }
                SeekFailurePolicy::Retry | SeekFailurePolicy::Hide => {
                    return Some(SkipIntroAction::SkipFailed);
                }
            }
        }
    })
    .filter_map(futures::future::ready)
    .boxed()
}

/// Parameters of the skip seek, copied out of the config
#[derive(Debug, Clone, Copy)]
struct SkipPlan {
    target: Duration,
    hold: Duration,
    policy: SeekFailurePolicy,
    retry_attempts: u32,
    retry_delay: Duration,
}

/// Build the skip-intro loop. Starts `Hidden`.
pub fn skip_intro(
    clock: Arc<dyn PlaybackClock>,
    config: &PlayerConfig,
) -> System<SkipIntroState, SkipIntroAction> {
    let intro_started = has_intro_started(clock.observe_time(), config.intro_start);
    let tick = config.countdown_tick;
    let mode = config.countdown_mode;
    let plan = SkipPlan {
        target: config.intro_end,
        hold: config.skip_hold,
        policy: config.seek_failure,
        retry_attempts: config.seek_retry_attempts,
        retry_delay: config.seek_retry_delay,
    };

    System::builder(
        "skip-intro",
        SkipIntroState::Hidden,
        reducer(config.skip_intro_countdown, mode),
    )
    .feedback(bind(
        intro_started.map(SkipIntroAction::HasIntroStarted).boxed(),
    ))
    .feedback(react(
        "countdown",
        |state: &SkipIntroState| state.seconds_left(),
        move |seconds_left| countdown_tick(seconds_left, tick, mode),
    ))
    .feedback(react(
        "skip",
        |state: &SkipIntroState| state.is_skipping().then_some(()),
        move |()| skip_seek(clock.clone(), plan),
    ))
    .build()
}

//! CLI command implementations

use crate::output::{format_snapshot, OutputFormat, SnapshotRecord};
use anyhow::{bail, Context};
use futures::StreamExt;
use loopplay_core::{
    PlaybackClock, PlayerConfig, PlayerViewModel, SimulatedClock, SimulatedClockConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

/// Options of the `run` command
#[derive(Debug)]
pub struct RunOptions {
    pub duration: f64,
    pub speed: f64,
    pub tap_at: Vec<f64>,
    pub start_at: f64,
    pub config: Option<PathBuf>,
}

fn media_secs(value: f64, name: &str) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("invalid {name}: {value}"))
}

/// Play a simulated video and print every distinct snapshot
pub async fn run(options: RunOptions, format: &str) -> anyhow::Result<()> {
    let format = OutputFormat::from(format);
    let duration = media_secs(options.duration, "duration")?;
    let start_at = media_secs(options.start_at, "start position")?;
    if start_at >= duration {
        bail!("start position {start_at:?} is past the end of the media ({duration:?})");
    }

    let config = match &options.config {
        Some(path) => PlayerConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PlayerConfig::default(),
    };
    let config = config.with_time_scale(options.speed)?;

    let clock = Arc::new(SimulatedClock::new(SimulatedClockConfig {
        tick_interval: config.clock_interval.div_f64(options.speed),
        advance_per_tick: config.clock_interval,
        seek_latency: SimulatedClockConfig::default()
            .seek_latency
            .div_f64(options.speed),
        duration: Some(duration),
        start_position: start_at,
    }));
    let view_model = PlayerViewModel::new(clock.clone(), config)?;

    info!(
        session_id = %view_model.id(),
        duration = ?duration,
        speed = options.speed,
        taps = options.tap_at.len(),
        "Starting playback"
    );

    let origin = Instant::now();
    let wall_time = |media: Duration| origin + media.saturating_sub(start_at).div_f64(options.speed);

    let mut taps = options
        .tap_at
        .iter()
        .map(|secs| media_secs(*secs, "tap time"))
        .collect::<anyhow::Result<Vec<_>>>()?;
    taps.retain(|tap| *tap >= start_at && *tap < duration);
    taps.sort();
    let mut taps = taps.into_iter().peekable();

    let mut snapshots = view_model.stream();
    let deadline = sleep_until(wall_time(duration) + Duration::from_millis(100));
    tokio::pin!(deadline);
    let mut has_played = false;

    view_model.on_toggle_play();

    loop {
        let next_tap = taps.peek().map(|tap| wall_time(*tap));
        tokio::select! {
            _ = &mut deadline => {
                debug!("Deadline reached");
                break;
            }
            _ = sleep_until(next_tap.unwrap_or(origin)), if next_tap.is_some() => {
                if let Some(tap) = taps.next() {
                    debug!(at = ?tap, "Tapping video surface");
                    view_model.on_hud_tap();
                }
            }
            snapshot = snapshots.next() => {
                let Some(state) = snapshot else {
                    break;
                };
                let record = SnapshotRecord::new(clock.current_time(), state);
                println!("{}", format_snapshot(&record, format));

                // end of media pauses the clock
                if has_played && !state.is_playing {
                    break;
                }
                has_played |= state.is_playing;
            }
        }
    }

    info!(
        session_id = %view_model.id(),
        position = ?clock.current_time(),
        seeks = clock.seek_log().len(),
        "Playback finished"
    );

    Ok(())
}

/// Print the default configuration
pub fn print_config() -> anyhow::Result<()> {
    println!("{}", PlayerConfig::default().to_json()?);
    Ok(())
}

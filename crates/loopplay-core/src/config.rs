//! Player configuration
//!
//! Constants consumed by the engines. They are supplied once and never change for the
//! lifetime of a view model. Durations serialize as floating-point seconds.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How the skip-intro countdown reaches `Skipping`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownMode {
    /// `SecondsLeftChanged(0)` reduces straight to `Skipping`
    #[default]
    ReducerDriven,
    /// The countdown feedback emits `StartSkippingIntro` once it sees `Showing(0)`
    FeedbackDriven,
}

/// What the skip executor does when the seek past the intro fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekFailurePolicy {
    /// Retry `seek_retry_attempts` times, then hide the overlay
    #[default]
    Retry,
    /// Hide the overlay on the first failure
    Hide,
    /// Leave the state machine in `Skipping`
    Stay,
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Distance covered by a single seek-forward/backward command
    #[serde(with = "secs")]
    pub incremental_seek: Duration,
    /// Media time after which the skip-intro countdown appears
    #[serde(with = "secs")]
    pub intro_start: Duration,
    /// Media time the skip seeks to
    #[serde(with = "secs")]
    pub intro_end: Duration,
    /// Countdown length in ticks
    pub skip_intro_countdown: u32,
    /// Delay between the last interaction and the HUD hiding itself
    #[serde(with = "secs")]
    pub hud_hide_delay: Duration,
    /// Length of one countdown tick
    #[serde(with = "secs")]
    pub countdown_tick: Duration,
    /// Sampling interval of the playback clock
    #[serde(with = "secs")]
    pub clock_interval: Duration,
    /// Where the zero check of the countdown lives
    pub countdown_mode: CountdownMode,
    /// Recovery when the skip seek fails
    pub seek_failure: SeekFailurePolicy,
    /// Extra seek attempts under `SeekFailurePolicy::Retry`
    pub seek_retry_attempts: u32,
    /// Pause between seek attempts
    #[serde(with = "secs")]
    pub seek_retry_delay: Duration,
    /// How long `Skipping` stays on screen after the seek lands
    #[serde(with = "secs")]
    pub skip_hold: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            incremental_seek: Duration::from_secs(15),
            intro_start: Duration::from_secs(15),
            intro_end: Duration::from_secs(60),
            skip_intro_countdown: 10,
            hud_hide_delay: Duration::from_secs(3),
            countdown_tick: Duration::from_secs(1),
            clock_interval: Duration::from_secs(1),
            countdown_mode: CountdownMode::ReducerDriven,
            seek_failure: SeekFailurePolicy::Retry,
            seek_retry_attempts: 2,
            seek_retry_delay: Duration::from_millis(500),
            skip_hold: Duration::from_secs(2),
        }
    }
}

impl PlayerConfig {
    /// Check invariants the engines rely on
    pub fn validate(&self) -> Result<()> {
        if self.intro_end <= self.intro_start {
            return Err(Error::InvalidConfig(format!(
                "intro_end ({:?}) must be after intro_start ({:?})",
                self.intro_end, self.intro_start
            )));
        }
        if self.countdown_tick.is_zero() {
            return Err(Error::InvalidConfig("countdown_tick must be non-zero".into()));
        }
        if self.hud_hide_delay.is_zero() {
            return Err(Error::InvalidConfig("hud_hide_delay must be non-zero".into()));
        }
        if self.clock_interval.is_zero() {
            return Err(Error::InvalidConfig("clock_interval must be non-zero".into()));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Shrink every wall-clock timer by `speed`. Media positions are left alone.
    pub fn with_time_scale(mut self, speed: f64) -> Result<Self> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(Error::InvalidConfig(format!("speed must be positive, got {speed}")));
        }
        self.hud_hide_delay = self.hud_hide_delay.div_f64(speed);
        self.countdown_tick = self.countdown_tick.div_f64(speed);
        self.seek_retry_delay = self.seek_retry_delay.div_f64(speed);
        self.skip_hold = self.skip_hold.div_f64(speed);
        Ok(self)
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

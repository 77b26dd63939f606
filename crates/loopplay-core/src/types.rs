//! Core types for Loopplay

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a view-model session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Skip Intro
// =============================================================================

/// Skip-intro overlay state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SkipIntroState {
    /// No overlay
    #[default]
    Hidden,
    /// Counting down towards an automatic skip
    Showing { seconds_left: u32 },
    /// Seek past the intro is in flight
    Skipping,
}

impl SkipIntroState {
    /// Seconds left on the countdown, if one is showing
    pub fn seconds_left(&self) -> Option<u32> {
        match self {
            SkipIntroState::Showing { seconds_left } => Some(*seconds_left),
            _ => None,
        }
    }

    pub fn is_skipping(&self) -> bool {
        matches!(self, SkipIntroState::Skipping)
    }
}

impl std::fmt::Display for SkipIntroState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipIntroState::Hidden => write!(f, "hidden"),
            SkipIntroState::Showing { seconds_left } => write!(f, "showing({seconds_left})"),
            SkipIntroState::Skipping => write!(f, "skipping"),
        }
    }
}

/// Actions folded by the skip-intro reducer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipIntroAction {
    /// Playback crossed (or fell back below) the intro start
    HasIntroStarted(bool),
    /// One countdown tick elapsed
    SecondsLeftChanged(u32),
    /// Countdown reached zero (feedback-driven countdown only)
    StartSkippingIntro,
    /// Seek past the intro completed
    DidSkipIntro,
    /// Seek past the intro gave up
    SkipFailed,
}

// =============================================================================
// HUD
// =============================================================================

/// Actions folded by the HUD-visibility reducer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HudAction {
    Hide,
    Show,
    Toggle,
}

// =============================================================================
// Player
// =============================================================================

/// Immutable UI snapshot handed to the rendering layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerState {
    pub is_playing: bool,
    pub is_hud_visible: bool,
    pub skip_intro: SkipIntroState,
}

impl PlayerState {
    /// Snapshot shown before every input has reported
    pub const INITIAL: PlayerState = PlayerState {
        is_playing: false,
        is_hud_visible: false,
        skip_intro: SkipIntroState::Hidden,
    };
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} hud={} skip_intro={}",
            if self.is_playing { "playing" } else { "paused" },
            if self.is_hud_visible { "visible" } else { "hidden" },
            self.skip_intro
        )
    }
}

//! Loopplay Core - Feedback-Loop State Engine for Video Player UIs
//!
//! This crate turns a playback clock and a handful of UI commands into one continuously
//! updated player state:
//! - Generic feedback-loop engine (reducer + feedbacks + replayed state)
//! - Request-keyed effects with cancellation (timers, seeks)
//! - HUD auto-hide
//! - Skip-intro countdown and seek
//! - Composite UI snapshot
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Loopplay Core                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐      ┌──────────────┐      ┌──────────────┐   │
//! │  │   Playback   │─────▶│  Skip Intro  │      │     HUD      │   │
//! │  │    Clock     │◀─seek│    System    │      │    System    │   │
//! │  └──────┬───────┘      └──────┬───────┘      └──────┬───────┘   │
//! │         │ playing             │                     │           │
//! │         └─────────────────────┼─────────────────────┘           │
//! │                               │                                 │
//! │                        ┌──────┴──────┐                          │
//! │                        │  Assembler  │                          │
//! │                        └──────┬──────┘                          │
//! │                               │                                 │
//! │                        ┌──────┴──────┐                          │
//! │                        │ View Model  │◀── tap / play / seek     │
//! │                        └─────────────┘                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use loopplay_core::{PlayerConfig, PlayerViewModel, SimulatedClock};
//! use std::sync::Arc;
//!
//! # async fn example() -> loopplay_core::Result<()> {
//! let clock = Arc::new(SimulatedClock::default());
//! let view_model = PlayerViewModel::new(clock, PlayerConfig::default())?;
//! view_model.on_toggle_play();
//! view_model.on_hud_tap();
//!
//! let mut states = view_model.subscribe();
//! while states.changed().await.is_ok() {
//!     println!("{}", *states.borrow());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod stream;
pub mod system;
pub mod feedback;
pub mod clock;
pub mod hud;
pub mod skip_intro;
pub mod assembler;
pub mod view_model;

pub use error::{Error, Result};
pub use types::*;
pub use config::{CountdownMode, PlayerConfig, SeekFailurePolicy};
pub use stream::{Relay, ReplayRelay};
pub use system::{ActionSink, Feedback, System, SystemBuilder};
pub use feedback::{bind, bind_latest, react};
pub use clock::{PlaybackClock, SimulatedClock, SimulatedClockConfig};
pub use assembler::combine_player_state;
pub use view_model::PlayerViewModel;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lock a mutex, recovering the guard if a previous holder panicked
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Log the library version
pub fn init() {
    tracing::info!(version = VERSION, "Loopplay Core initialized");
}

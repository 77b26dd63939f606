//! Player view model
//!
//! Wires the clock, the HUD loop and the skip-intro loop into one [`PlayerState`] value for
//! the rendering layer, and exposes the four UI commands.

use crate::{
    assembler::combine_player_state,
    clock::PlaybackClock,
    config::PlayerConfig,
    hud::hud_visibility,
    skip_intro::skip_intro,
    stream::{Relay, ReplayRelay},
    system::System,
    types::*,
    Result,
};
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, Instrument};

/// View model behind a player screen
pub struct PlayerViewModel {
    /// Unique session ID
    id: SessionId,
    /// Configuration
    config: PlayerConfig,
    /// Media clock
    clock: Arc<dyn PlaybackClock>,
    /// HUD taps
    taps: Relay<()>,
    /// Any UI interaction, taps included
    interactions: Relay<()>,
    /// HUD visibility loop
    hud: System<bool, HudAction>,
    /// Skip-intro loop
    skip_intro: System<SkipIntroState, SkipIntroAction>,
    /// Latest composite snapshot
    state_rx: watch::Receiver<PlayerState>,
    /// Every composite snapshot, replayed
    snapshots: ReplayRelay<PlayerState>,
    /// Task feeding `state_rx`
    driver: JoinHandle<()>,
}

impl PlayerViewModel {
    /// Create a view model and start its loops. Must be called within a Tokio runtime.
    pub fn new(clock: Arc<dyn PlaybackClock>, config: PlayerConfig) -> Result<Self> {
        config.validate()?;
        let id = SessionId::new();

        let taps = Relay::new();
        let interactions = Relay::new();
        let hud = hud_visibility(taps.stream(), interactions.stream(), config.hud_hide_delay);
        let skip_intro = skip_intro(clock.clone(), &config);

        let mut snapshots = combine_player_state(
            clock.observe_playing_status(),
            hud.stream(),
            skip_intro.stream(),
        );
        let (state_tx, state_rx) = watch::channel(PlayerState::INITIAL);
        let published = ReplayRelay::new(PlayerState::INITIAL);
        let relay = published.clone();
        let span = tracing::info_span!("player", session_id = %id);
        let driver = tokio::spawn(
            async move {
                while let Some(state) = snapshots.next().await {
                    debug!(%state, "Player state");
                    state_tx.send_replace(state);
                    relay.publish(state);
                }
                debug!("Player state stream ended");
            }
            .instrument(span),
        );

        info!(
            session_id = %id,
            intro_start = ?config.intro_start,
            intro_end = ?config.intro_end,
            countdown = config.skip_intro_countdown,
            "Player view model created"
        );

        Ok(Self {
            id,
            config,
            clock,
            taps,
            interactions,
            hud,
            skip_intro,
            state_rx,
            snapshots: published,
            driver,
        })
    }

    /// Get session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Current composite snapshot
    pub fn state(&self) -> PlayerState {
        *self.state_rx.borrow()
    }

    /// Subscribe to the latest snapshot. Intermediate snapshots may be skipped.
    pub fn subscribe(&self) -> watch::Receiver<PlayerState> {
        self.state_rx.clone()
    }

    /// Current snapshot, then every later snapshot in order
    pub fn stream(&self) -> BoxStream<'static, PlayerState> {
        self.snapshots.stream()
    }

    /// Current skip-intro state, straight from its loop
    pub fn skip_intro_state(&self) -> SkipIntroState {
        self.skip_intro.state()
    }

    /// Current HUD visibility, straight from its loop
    pub fn is_hud_visible(&self) -> bool {
        self.hud.state()
    }

    /// User tapped the video surface
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn on_hud_tap(&self) {
        self.taps.accept(());
        self.interactions.accept(());
    }

    /// User pressed play/pause
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn on_toggle_play(&self) {
        if self.state().is_playing {
            self.clock.pause();
        } else {
            self.clock.play();
        }
        self.interactions.accept(());
    }

    /// User pressed seek forward
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn on_seek_forward(&self) -> Result<()> {
        self.interactions.accept(());
        let target = self.clock.current_time() + self.config.incremental_seek;
        self.clock.seek(target).await
    }

    /// User pressed seek backward
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn on_seek_backward(&self) -> Result<()> {
        self.interactions.accept(());
        let target = self
            .clock
            .current_time()
            .saturating_sub(self.config.incremental_seek);
        self.clock.seek(target).await
    }
}

impl Drop for PlayerViewModel {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

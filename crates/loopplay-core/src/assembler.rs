//! Composite player state
//!
//! Latest-value combination of the playing status, HUD visibility and skip-intro streams.
//! Nothing is emitted until each input has produced a value; afterwards every change of any
//! input yields a new snapshot, and consecutive equal snapshots are collapsed.

use crate::stream::distinct_until_changed;
use crate::types::{PlayerState, SkipIntroState};
use futures::stream::{self, BoxStream, StreamExt};

enum Update {
    Playing(bool),
    Hud(bool),
    SkipIntro(SkipIntroState),
}

#[derive(Default)]
struct Latest {
    is_playing: Option<bool>,
    is_hud_visible: Option<bool>,
    skip_intro: Option<SkipIntroState>,
}

impl Latest {
    fn apply(&mut self, update: Update) -> Option<PlayerState> {
        match update {
            Update::Playing(value) => self.is_playing = Some(value),
            Update::Hud(value) => self.is_hud_visible = Some(value),
            Update::SkipIntro(value) => self.skip_intro = Some(value),
        }

        Some(PlayerState {
            is_playing: self.is_playing?,
            is_hud_visible: self.is_hud_visible?,
            skip_intro: self.skip_intro?,
        })
    }
}

/// Combine the three inputs into a stream of [`PlayerState`] snapshots
///
/// Ends once all three inputs have ended.
pub fn combine_player_state(
    is_playing: BoxStream<'static, bool>,
    is_hud_visible: BoxStream<'static, bool>,
    skip_intro: BoxStream<'static, SkipIntroState>,
) -> BoxStream<'static, PlayerState> {
    let updates = stream::select_all([
        is_playing.map(Update::Playing).boxed(),
        is_hud_visible.map(Update::Hud).boxed(),
        skip_intro.map(Update::SkipIntro).boxed(),
    ]);

    let snapshots = updates
        .scan(Latest::default(), |latest, update| {
            futures::future::ready(Some(latest.apply(update)))
        })
        .filter_map(futures::future::ready);

    distinct_until_changed(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{Relay, ReplayRelay};

    #[tokio::test]
    async fn test_waits_for_every_input() {
        let playing = Relay::new();
        let hud = Relay::new();
        let skip = ReplayRelay::new(SkipIntroState::Hidden);

        let mut states = combine_player_state(playing.stream(), hud.stream(), skip.stream());

        playing.accept(true);
        hud.accept(false);
        assert_eq!(
            states.next().await,
            Some(PlayerState {
                is_playing: true,
                is_hud_visible: false,
                skip_intro: SkipIntroState::Hidden,
            })
        );

        skip.publish(SkipIntroState::Showing { seconds_left: 3 });
        assert_eq!(
            states.next().await.map(|s| s.skip_intro),
            Some(SkipIntroState::Showing { seconds_left: 3 })
        );

        hud.accept(true);
        let state = states.next().await.unwrap();
        assert!(state.is_playing);
        assert!(state.is_hud_visible);
        assert_eq!(state.skip_intro, SkipIntroState::Showing { seconds_left: 3 });
    }

    #[tokio::test]
    async fn test_every_input_change_yields_a_snapshot() {
        let playing = ReplayRelay::new(true);
        let hud = ReplayRelay::new(false);
        let skip = ReplayRelay::new(SkipIntroState::Hidden);
        let mut states = combine_player_state(playing.stream(), hud.stream(), skip.stream());
        assert_eq!(
            states.next().await.map(|s| s.skip_intro),
            Some(SkipIntroState::Hidden)
        );

        for seconds_left in (0..=3).rev() {
            skip.publish(SkipIntroState::Showing { seconds_left });
        }
        skip.publish(SkipIntroState::Skipping);
        drop((playing, hud, skip));

        let countdown: Vec<SkipIntroState> = states.map(|s| s.skip_intro).collect().await;
        assert_eq!(countdown.last(), Some(&SkipIntroState::Skipping));
        let shown: Vec<u32> = countdown.iter().filter_map(|s| s.seconds_left()).collect();
        assert_eq!(shown, vec![3, 2, 1, 0]);
    }

    #[tokio::test]
    async fn test_collapses_repeated_snapshots() {
        let playing = stream::iter(vec![false, false, true]).boxed();
        let hud = stream::iter(vec![false]).boxed();
        let skip = stream::iter(vec![SkipIntroState::Hidden, SkipIntroState::Hidden]).boxed();

        let states: Vec<PlayerState> = combine_player_state(playing, hud, skip).collect().await;

        assert!(!states.is_empty());
        assert_eq!(states.last().map(|s| s.is_playing), Some(true));
        for pair in states.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[tokio::test]
    async fn test_ends_with_inputs() {
        let states: Vec<PlayerState> = combine_player_state(
            stream::empty().boxed(),
            stream::iter(vec![true]).boxed(),
            stream::iter(vec![SkipIntroState::Skipping]).boxed(),
        )
        .collect()
        .await;
        assert!(states.is_empty());
    }
}

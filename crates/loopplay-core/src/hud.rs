//! HUD visibility
//!
//! Taps toggle the HUD. Every interaction (taps included) schedules a `Hide` after
//! `hide_delay`; a newer interaction replaces the pending one, so only the latest can fire.

use crate::feedback::{after, bind, bind_latest};
use crate::system::System;
use crate::types::HudAction;
use futures::stream::{BoxStream, StreamExt};
use std::time::Duration;

/// HUD reducer
pub fn reduce(visible: &bool, action: HudAction) -> bool {
    match action {
        HudAction::Hide => false,
        HudAction::Show => true,
        HudAction::Toggle => !visible,
    }
}

/// Build the HUD visibility loop. Starts hidden.
pub fn hud_visibility(
    taps: BoxStream<'static, ()>,
    interactions: BoxStream<'static, ()>,
    hide_delay: Duration,
) -> System<bool, HudAction> {
    System::builder("hud", false, reduce)
        .feedback(bind(taps.map(|_| HudAction::Toggle).boxed()))
        .feedback(bind_latest("auto-hide", interactions, move |_| {
            after(hide_delay, HudAction::Hide)
        }))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Relay;

    fn fold(actions: &[HudAction]) -> bool {
        actions.iter().fold(false, |visible, action| reduce(&visible, *action))
    }

    #[test]
    fn test_reducer() {
        assert!(!fold(&[]));
        assert!(fold(&[HudAction::Toggle]));
        assert!(!fold(&[HudAction::Toggle, HudAction::Toggle]));
        assert!(!fold(&[HudAction::Toggle, HudAction::Hide]));
        assert!(fold(&[HudAction::Hide, HudAction::Toggle]));
        assert!(fold(&[HudAction::Show, HudAction::Show]));
        assert!(!fold(&[HudAction::Show, HudAction::Toggle]));
    }

    #[test]
    fn test_hide_wins_then_toggles_count_from_there() {
        use HudAction::*;
        let sequences: [&[HudAction]; 4] = [
            &[Toggle, Toggle, Toggle, Hide],
            &[Toggle, Hide, Toggle, Toggle, Toggle],
            &[Hide, Hide, Toggle, Toggle],
            &[Toggle, Toggle, Hide, Toggle],
        ];
        for actions in sequences {
            let since_hide = actions.iter().rev().take_while(|a| **a != Hide).count();
            assert_eq!(fold(actions), since_hide % 2 == 1, "{actions:?}");
        }
    }

    struct Harness {
        taps: Relay<()>,
        interactions: Relay<()>,
        hud: System<bool, HudAction>,
        origin: tokio::time::Instant,
    }

    impl Harness {
        fn new() -> Self {
            let taps = Relay::new();
            let interactions = Relay::new();
            let hud = hud_visibility(taps.stream(), interactions.stream(), Duration::from_secs(3));
            hud.start();
            Self {
                taps,
                interactions,
                hud,
                origin: tokio::time::Instant::now(),
            }
        }

        fn tap(&self) {
            self.taps.accept(());
            self.interactions.accept(());
        }

        async fn at(&self, secs: f64) -> bool {
            tokio::time::sleep_until(self.origin + Duration::from_secs_f64(secs)).await;
            self.hud.state()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tap_shows_then_auto_hides() {
        let harness = Harness::new();

        harness.tap();
        assert!(harness.at(0.1).await);
        assert!(harness.at(2.9).await);
        assert!(!harness.at(3.1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_interaction_postpones_hide() {
        let harness = Harness::new();

        harness.tap();
        assert!(harness.at(1.0).await);
        harness.tap();
        assert!(!harness.at(2.0).await);
        harness.tap();
        assert!(harness.at(3.1).await);
        assert!(harness.at(4.9).await);
        assert!(!harness.at(5.1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_tap_interaction_only_hides() {
        let harness = Harness::new();

        harness.tap();
        assert!(harness.at(1.0).await);
        harness.interactions.accept(());
        assert!(harness.at(3.5).await);
        assert!(!harness.at(4.1).await);
    }
}

//! Benchmark tests for loopplay-core operations
//!
//! Run with: cargo bench -p loopplay-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use futures::stream::{self, StreamExt};
use std::time::Duration;

use loopplay_core::assembler::combine_player_state;
use loopplay_core::hud;
use loopplay_core::skip_intro::{has_intro_started, reducer};
use loopplay_core::{CountdownMode, HudAction, SkipIntroAction, SkipIntroState, System};

// ============================================================================
// Helpers
// ============================================================================

fn hud_actions(count: usize) -> Vec<HudAction> {
    (0..count)
        .map(|i| match i % 5 {
            4 => HudAction::Hide,
            _ => HudAction::Toggle,
        })
        .collect()
}

fn skip_intro_episode() -> Vec<SkipIntroAction> {
    let mut actions = vec![SkipIntroAction::HasIntroStarted(false), SkipIntroAction::HasIntroStarted(true)];
    actions.extend((0..10).rev().map(SkipIntroAction::SecondsLeftChanged));
    actions.push(SkipIntroAction::DidSkipIntro);
    actions
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

// ============================================================================
// Reducers
// ============================================================================

fn bench_reducers(c: &mut Criterion) {
    let mut group = c.benchmark_group("reducers");

    for count in [10, 100, 1000] {
        let actions = hud_actions(count);
        group.bench_with_input(BenchmarkId::new("hud_fold", count), &actions, |b, actions| {
            b.iter(|| {
                actions
                    .iter()
                    .fold(false, |visible, action| hud::reduce(&visible, black_box(*action)))
            })
        });
    }

    let episode = skip_intro_episode();
    for mode in [CountdownMode::ReducerDriven, CountdownMode::FeedbackDriven] {
        let reduce = reducer(10, mode);
        group.bench_with_input(
            BenchmarkId::new("skip_intro_episode", format!("{mode:?}")),
            &episode,
            |b, episode| {
                b.iter(|| {
                    episode
                        .iter()
                        .fold(SkipIntroState::Hidden, |state, action| reduce(&state, black_box(*action)))
                })
            },
        );
    }

    group.finish();
}

// ============================================================================
// Streams
// ============================================================================

fn bench_streams(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("streams");

    group.bench_function("has_intro_started_3600_samples", |b| {
        b.to_async(&rt).iter(|| async {
            let times = stream::iter((0..3600).map(Duration::from_secs)).boxed();
            has_intro_started(times, Duration::from_secs(15)).count().await
        })
    });

    group.bench_function("combine_player_state_1000_updates", |b| {
        b.to_async(&rt).iter(|| async {
            let playing = stream::iter((0..1000).map(|i| i % 7 == 0)).boxed();
            let hud = stream::iter((0..1000).map(|i| i % 3 == 0)).boxed();
            let skip = stream::iter((0..1000u32).map(|i| SkipIntroState::Showing { seconds_left: i % 10 })).boxed();
            combine_player_state(playing, hud, skip).count().await
        })
    });

    group.finish();
}

// ============================================================================
// Feedback Loop
// ============================================================================

fn bench_system_throughput(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("system");

    for count in [100u64, 1000, 10_000] {
        group.bench_with_input(BenchmarkId::new("reduce_actions", count), &count, |b, &count| {
            b.to_async(&rt).iter(|| async move {
                let system = System::builder("bench", 0u64, |total: &u64, add: u64| total + add).build();
                let mut rx = system.subscribe();
                for _ in 0..count {
                    let _ = system.send(1);
                }
                let _ = rx.wait_for(|total| *total == count).await;
            })
        });
    }

    group.finish();
}

criterion_group!(reducer_benches, bench_reducers);

criterion_group!(stream_benches, bench_streams);

criterion_group!(system_benches, bench_system_throughput);

criterion_main!(reducer_benches, stream_benches, system_benches);

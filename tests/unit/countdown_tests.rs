//! Countdown behavior under simulated clock control.

use ctf_console::countdown::{format_clock, Countdown};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{advance, Duration};

fn counted_hook() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
    let fired = Arc::new(AtomicUsize::new(0));
    let hook_fired = fired.clone();
    (fired, move || {
        hook_fired.fetch_add(1, Ordering::SeqCst);
    })
}

async fn settle() {
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
}

#[tokio::test(start_paused = true)]
async fn sixty_five_seconds_count_down_to_a_single_expiry() {
    let (fired, hook) = counted_hook();
    let mut countdown = Countdown::new();
    countdown.start(65, hook);
    assert_eq!(format_clock(countdown.seconds_remaining()), "01:05");

    advance(Duration::from_secs(5)).await;
    settle().await;
    assert_eq!(format_clock(countdown.seconds_remaining()), "01:00");

    for _ in 0..60 {
        advance(Duration::from_secs(1)).await;
        settle().await;
    }

    assert_eq!(format_clock(countdown.seconds_remaining()), "00:00");
    assert!(!countdown.is_running());
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    advance(Duration::from_secs(30)).await;
    settle().await;
    assert_eq!(countdown.seconds_remaining(), 0);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn display_derives_from_elapsed_time_not_tick_count() {
    let (fired, hook) = counted_hook();
    let mut countdown = Countdown::new();
    countdown.start(300, hook);

    // One big jump stands in for a machine that slept through its ticks.
    advance(Duration::from_secs(100)).await;
    settle().await;
    assert_eq!(countdown.seconds_remaining(), 200);

    advance(Duration::from_secs(250)).await;
    settle().await;
    assert_eq!(countdown.seconds_remaining(), 0);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn reset_reanchors_without_firing_the_old_run() {
    let (fired, hook) = counted_hook();
    let mut countdown = Countdown::new();
    countdown.start(5, hook);

    advance(Duration::from_secs(3)).await;
    settle().await;
    assert_eq!(countdown.seconds_remaining(), 2);

    countdown.reset(60);
    assert_eq!(countdown.seconds_remaining(), 60);

    // Past the point where the first run would have hit zero.
    advance(Duration::from_secs(10)).await;
    settle().await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert_eq!(countdown.seconds_remaining(), 50);
}

#[tokio::test(start_paused = true)]
async fn subscriber_sees_every_displayed_value() {
    let (_fired, hook) = counted_hook();
    let mut countdown = Countdown::new();
    countdown.start(3, hook);
    let mut updates = countdown.subscribe();

    let mut seen = Vec::new();
    for _ in 0..3 {
        advance(Duration::from_secs(1)).await;
        settle().await;
        updates.changed().await.expect("sender alive");
        seen.push(*updates.borrow());
    }
    assert_eq!(seen, vec![2, 1, 0]);
}

#[tokio::test(start_paused = true)]
async fn stopping_freezes_the_display_and_cancels_expiry() {
    let (fired, hook) = counted_hook();
    let mut countdown = Countdown::new();
    countdown.start(10, hook);

    advance(Duration::from_secs(4)).await;
    settle().await;
    let frozen = countdown.seconds_remaining();
    countdown.stop();

    advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(countdown.seconds_remaining(), frozen);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

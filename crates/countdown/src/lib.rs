//! Countdown timer anchored to a monotonic clock.
//!
//! The displayed value is always re-derived from the anchor timestamp
//! (`initial - elapsed_whole_seconds`, clamped at zero), never decremented
//! per tick, so the timer self-corrects after suspension or missed ticks.
//! One instance backs the challenge view; the admin monitoring view runs one
//! per active user row and re-anchors each on every poll.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::trace;

/// Callback invoked exactly once when a countdown run reaches zero.
pub type ExpireHook = Arc<dyn Fn() + Send + Sync>;

/// A restartable one-second countdown.
///
/// Dropping the countdown aborts its tick task, so a view can be torn down
/// and remounted without leaking a recurring interval.
pub struct Countdown {
    remaining_tx: watch::Sender<u64>,
    running: Arc<AtomicBool>,
    on_expire: Option<ExpireHook>,
    tick: Option<JoinHandle<()>>,
}

impl Countdown {
    pub fn new() -> Self {
        let (remaining_tx, _) = watch::channel(0);
        Self {
            remaining_tx,
            running: Arc::new(AtomicBool::new(false)),
            on_expire: None,
            tick: None,
        }
    }

    /// Start (or restart) the countdown from `initial_seconds`.
    ///
    /// Replaces any previous expiry hook and any run still in flight.
    /// An `initial_seconds` of zero expires immediately.
    pub fn start<F>(&mut self, initial_seconds: u64, on_expire: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_expire = Some(Arc::new(on_expire));
        self.anchor(initial_seconds);
    }

    /// Re-anchor with a new initial value, keeping the current expiry hook.
    ///
    /// Any still-pending expiration from the superseded run is cancelled.
    pub fn reset(&mut self, new_seconds: u64) {
        self.anchor(new_seconds);
    }

    /// Stop the countdown. Idempotent; safe to call when not running.
    pub fn stop(&mut self) {
        if let Some(handle) = self.tick.take() {
            handle.abort();
        }
        self.running.store(false, Ordering::SeqCst);
    }

    /// Latest derived display value, clamped at zero.
    pub fn seconds_remaining(&self) -> u64 {
        *self.remaining_tx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Subscribe to display updates (one message per tick).
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.remaining_tx.subscribe()
    }

    fn anchor(&mut self, initial_seconds: u64) {
        self.stop();
        self.remaining_tx.send_replace(initial_seconds);
        self.running.store(true, Ordering::SeqCst);

        let tx = self.remaining_tx.clone();
        let running = self.running.clone();
        let hook = self.on_expire.clone();
        let anchored_at = Instant::now();

        self.tick = Some(tokio::spawn(async move {
            if initial_seconds == 0 {
                running.store(false, Ordering::SeqCst);
                if let Some(hook) = hook {
                    hook();
                }
                return;
            }

            let mut ticker = interval(Duration::from_secs(1));
            // A suspended task catches up via the anchor, not via burst ticks.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await; // first tick completes immediately

            loop {
                ticker.tick().await;
                let elapsed = anchored_at.elapsed().as_secs();
                let remaining = initial_seconds.saturating_sub(elapsed);
                trace!(remaining, "countdown tick");
                tx.send_replace(remaining);

                if remaining == 0 {
                    running.store(false, Ordering::SeqCst);
                    if let Some(hook) = &hook {
                        hook();
                    }
                    break;
                }
            }
        }));
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Format seconds as an `MM:SS` clock string.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

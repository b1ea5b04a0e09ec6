use ctf_console_api_client::{AdminApi, ApiResult, SubmissionRecord};
use ctf_console_countdown::{format_clock, Countdown};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

/// Fixed monitoring poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Submission history shown per row is bounded.
pub const MAX_RECENT_SUBMISSIONS: usize = 5;

/// One active user being monitored. The countdown ticks locally between
/// polls and is re-anchored to the polled ground truth on every poll, so
/// independently ticking rows cannot drift.
struct MonitoredRow {
    username: String,
    current_level: u32,
    last_submissions: Vec<SubmissionRecord>,
    countdown: Countdown,
}

/// Read-only copy of a row for rendering.
#[derive(Debug, Clone)]
pub struct RowSnapshot {
    pub user_id: Uuid,
    pub username: String,
    pub current_level: u32,
    pub seconds_remaining: u64,
    pub clock: String,
    pub last_submissions: Vec<SubmissionRecord>,
}

/// Polls the aggregate monitoring endpoint and maintains per-user countdowns
/// while the monitoring view is mounted. Dropping the monitor cancels the
/// poll task and every row countdown.
pub struct AdminMonitor {
    api: Arc<dyn AdminApi>,
    rows: Arc<RwLock<BTreeMap<Uuid, MonitoredRow>>>,
    poll_interval: Duration,
    poll_task: Option<JoinHandle<()>>,
}

impl AdminMonitor {
    pub fn new(api: Arc<dyn AdminApi>) -> Self {
        Self {
            api,
            rows: Arc::new(RwLock::new(BTreeMap::new())),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_task: None,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Fetch the monitoring snapshot once and reconcile the row table.
    /// Returns the number of active rows.
    pub async fn poll_once(&self) -> ApiResult<usize> {
        poll_into(&self.api, &self.rows).await
    }

    /// Start the recurring poll. Any previous poll task is cancelled first.
    pub fn spawn_polling(&mut self) {
        self.stop();
        let api = self.api.clone();
        let rows = self.rows.clone();
        let poll_interval = self.poll_interval;

        self.poll_task = Some(tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match poll_into(&api, &rows).await {
                    Ok(active) => debug!(active, "monitoring poll complete"),
                    // Transient poll failures keep the previous rows; the
                    // next tick retries naturally.
                    Err(e) => warn!(error = %e, "monitoring poll failed"),
                }
            }
        }));
    }

    /// Suspend polling (navigating away from the monitoring view).
    /// Idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poll_task.is_some()
    }

    /// Rows sorted by username, for rendering. An empty vec means the view
    /// shows its explicit empty state.
    pub async fn snapshot(&self) -> Vec<RowSnapshot> {
        let rows = self.rows.read().await;
        let mut out: Vec<RowSnapshot> = rows
            .iter()
            .map(|(user_id, row)| {
                let seconds_remaining = row.countdown.seconds_remaining();
                RowSnapshot {
                    user_id: *user_id,
                    username: row.username.clone(),
                    current_level: row.current_level,
                    seconds_remaining,
                    clock: format_clock(seconds_remaining),
                    last_submissions: row.last_submissions.clone(),
                }
            })
            .collect();
        out.sort_by(|a, b| a.username.cmp(&b.username));
        out
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    pub async fn approve(&self, user_id: Uuid) -> ApiResult<usize> {
        self.api.approve_user(user_id).await?;
        self.poll_once().await
    }

    pub async fn disapprove(&self, user_id: Uuid) -> ApiResult<usize> {
        self.api.disapprove_user(user_id).await?;
        self.poll_once().await
    }

    pub async fn reset_user(&self, user_id: Uuid) -> ApiResult<usize> {
        self.api.reset_user(user_id).await?;
        self.poll_once().await
    }

    pub async fn delete_user(&self, user_id: Uuid) -> ApiResult<usize> {
        self.api.delete_user(user_id).await?;
        self.poll_once().await
    }
}

impl Drop for AdminMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_into(
    api: &Arc<dyn AdminApi>,
    rows: &Arc<RwLock<BTreeMap<Uuid, MonitoredRow>>>,
) -> ApiResult<usize> {
    let snapshot = api.monitoring().await?;
    let mut rows = rows.write().await;

    let mut seen = BTreeSet::new();
    for user in snapshot.users.into_iter().filter(|u| u.is_active) {
        seen.insert(user.user_id);
        let row = rows.entry(user.user_id).or_insert_with(|| MonitoredRow {
            username: user.username.clone(),
            current_level: user.current_level,
            last_submissions: Vec::new(),
            countdown: Countdown::new(),
        });
        row.username = user.username;
        row.current_level = user.current_level;
        let mut submissions = user.last_submissions;
        submissions.truncate(MAX_RECENT_SUBMISSIONS);
        row.last_submissions = submissions;
        // Re-anchor to ground truth on every poll.
        row.countdown.reset(user.time_remaining_seconds);
    }

    // Rows for users that went inactive disappear; dropping the row aborts
    // its countdown task.
    rows.retain(|user_id, _| seen.contains(user_id));
    Ok(rows.len())
}

use ctf_console_api_client::{
    ApiError, ApiResult, ChallengeApi, ChallengeStatus, CurrentChallenge, EndReason,
};
use ctf_console_countdown::Countdown;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Classification of the challenge view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    NotStarted,
    Active,
    EndedExpired,
    EndedCompleted,
}

/// Out-of-band events the view loop reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeEvent {
    /// The local countdown hit zero. The server remains authoritative; the
    /// view marks itself expired and stops accepting submissions.
    TimerExpired,
}

/// Result of a flag submission as the view sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Incorrect { total_attempts: Option<u32> },
    Advanced { next_level: u32 },
    Completed,
    Expired,
    AlreadyEnded(EndReason),
}

/// Orchestrates the challenge view: loads status, classifies it, anchors the
/// countdown to server-reported time, and submits flags.
///
/// All mutation is sequential through `&mut self`; the countdown only drives
/// a derived display value and the expiry event, never the status snapshot.
pub struct ChallengeController {
    api: Arc<dyn ChallengeApi>,
    countdown: Countdown,
    state: ViewState,
    status: Option<ChallengeStatus>,
    current: Option<CurrentChallenge>,
    events: mpsc::UnboundedSender<ChallengeEvent>,
}

/// Map a status snapshot to a view state.
pub fn classify(status: &ChallengeStatus) -> ViewState {
    if status.is_completed {
        ViewState::EndedCompleted
    } else if !status.has_started {
        ViewState::NotStarted
    } else if status.is_active && status.time_remaining_seconds > 0 {
        ViewState::Active
    } else {
        ViewState::EndedExpired
    }
}

impl ChallengeController {
    pub fn new(api: Arc<dyn ChallengeApi>) -> (Self, mpsc::UnboundedReceiver<ChallengeEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                api,
                countdown: Countdown::new(),
                state: ViewState::NotStarted,
                status: None,
                current: None,
                events,
            },
            events_rx,
        )
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn status(&self) -> Option<&ChallengeStatus> {
        self.status.as_ref()
    }

    pub fn current(&self) -> Option<&CurrentChallenge> {
        self.current.as_ref()
    }

    pub fn seconds_remaining(&self) -> u64 {
        self.countdown.seconds_remaining()
    }

    pub fn is_counting(&self) -> bool {
        self.countdown.is_running()
    }

    pub fn subscribe_countdown(&self) -> tokio::sync::watch::Receiver<u64> {
        self.countdown.subscribe()
    }

    /// Fetch status (and the current challenge when active), classify, and
    /// anchor the countdown with the server's remaining time only in the
    /// `Active` state.
    pub async fn load(&mut self) -> ApiResult<ViewState> {
        let status = match self.api.status().await {
            Ok(status) => status,
            Err(e) => return self.absorb_terminal(e),
        };
        self.apply_status(status).await?;
        Ok(self.state)
    }

    /// Request a challenge start. An "already started" signal from the
    /// server is success, not an error.
    pub async fn start(&mut self) -> ApiResult<ViewState> {
        match self.api.start().await {
            Ok(response) => {
                if response.already_started {
                    debug!("challenge already started, reloading status");
                }
                self.load().await
            }
            Err(e) => self.absorb_terminal(e),
        }
    }

    /// Submit a candidate flag.
    ///
    /// Empty and whitespace-only input is rejected locally without a network
    /// call. A server-signalled expiry (410 or the ended code) transitions
    /// the view regardless of what the local countdown shows.
    pub async fn submit_flag(&mut self, candidate: &str) -> ApiResult<SubmitOutcome> {
        let flag = candidate.trim();
        if flag.is_empty() {
            return Err(ApiError::Validation("flag must not be empty".to_string()));
        }
        match self.state {
            ViewState::EndedCompleted => return Err(ApiError::Ended(EndReason::Completed)),
            ViewState::EndedExpired => return Err(ApiError::Ended(EndReason::Expired)),
            _ => {}
        }

        match self.api.submit(flag).await {
            Ok(response) if response.correct && response.challenge_completed => {
                self.state = ViewState::EndedCompleted;
                self.countdown.stop();
                self.refresh_status_best_effort().await;
                Ok(SubmitOutcome::Completed)
            }
            Ok(response) if response.correct => {
                // Re-anchor immediately from the submit response; the status
                // reload refines it if the server included none.
                if let Some(seconds) = response.time_remaining_seconds {
                    self.arm_countdown(seconds);
                }
                let next_level = response.next_level;
                self.refresh_status_best_effort().await;
                let next_level = next_level
                    .or_else(|| self.status.as_ref().map(|s| s.current_level))
                    .unwrap_or_default();
                Ok(SubmitOutcome::Advanced { next_level })
            }
            Ok(response) => {
                self.refresh_status_best_effort().await;
                Ok(SubmitOutcome::Incorrect {
                    total_attempts: response.total_attempts,
                })
            }
            Err(ApiError::Ended(EndReason::Expired)) => {
                self.state = ViewState::EndedExpired;
                self.countdown.stop();
                Ok(SubmitOutcome::Expired)
            }
            Err(ApiError::Ended(EndReason::Completed)) => {
                self.state = ViewState::EndedCompleted;
                self.countdown.stop();
                Ok(SubmitOutcome::AlreadyEnded(EndReason::Completed))
            }
            // Transient failures leave the view untouched; the user may
            // retry manually.
            Err(e) => Err(e),
        }
    }

    /// Called by the view loop when it receives [`ChallengeEvent::TimerExpired`].
    /// The next load or submit reconciles with the server's verdict.
    pub fn mark_expired(&mut self) {
        if self.state == ViewState::Active {
            self.state = ViewState::EndedExpired;
            self.countdown.stop();
        }
    }

    async fn apply_status(&mut self, status: ChallengeStatus) -> ApiResult<()> {
        self.state = classify(&status);
        let remaining = status.time_remaining_seconds;
        self.status = Some(status);

        if self.state == ViewState::Active {
            match self.api.current().await {
                Ok(current) => self.current = Some(current),
                Err(e) => {
                    self.absorb_terminal(e)?;
                    return Ok(());
                }
            }
            self.arm_countdown(remaining);
        } else {
            self.countdown.stop();
        }
        Ok(())
    }

    /// Map domain-terminal errors into frozen end states instead of
    /// bubbling; everything else propagates.
    fn absorb_terminal(&mut self, error: ApiError) -> ApiResult<ViewState> {
        match error {
            ApiError::Ended(EndReason::Expired) => {
                self.state = ViewState::EndedExpired;
                self.countdown.stop();
                Ok(self.state)
            }
            ApiError::Ended(EndReason::Completed) => {
                self.state = ViewState::EndedCompleted;
                self.countdown.stop();
                Ok(self.state)
            }
            ApiError::NotStarted => {
                self.state = ViewState::NotStarted;
                self.countdown.stop();
                Ok(self.state)
            }
            other => Err(other),
        }
    }

    fn arm_countdown(&mut self, seconds: u64) {
        let events = self.events.clone();
        self.countdown.start(seconds, move || {
            let _ = events.send(ChallengeEvent::TimerExpired);
        });
    }

    async fn refresh_status_best_effort(&mut self) {
        match self.api.status().await {
            Ok(status) => {
                // Terminal states reached via submit are not downgraded by a
                // racing status read.
                if self.state == ViewState::Active || self.state == ViewState::NotStarted {
                    if let Err(e) = self.apply_status(status).await {
                        warn!(error = %e, "status refresh after submit failed");
                    }
                } else {
                    self.status = Some(status);
                }
            }
            Err(e) => warn!(error = %e, "status refresh after submit failed"),
        }
    }
}

use anyhow::Result;
use clap::{Args, Parser};
use ctf_console_api_client::ChallengeApi;
use ctf_console_challenge::{ChallengeController, ChallengeEvent, SubmitOutcome, ViewState};
use ctf_console_countdown::format_clock;
use ctf_console_session::{RouteRequirement, SessionStore};
use std::io::Write;
use std::sync::Arc;

use crate::{ensure, surface};

#[derive(Parser)]
pub struct ChallengeCmd {
    #[command(subcommand)]
    command: ChallengeCommands,
}

#[derive(Parser)]
enum ChallengeCommands {
    /// Show challenge progress and remaining time
    Status,

    /// Start (or resume) the timed challenge run
    Start,

    /// Submit a flag for the current level
    Submit(SubmitArgs),

    /// Show the hint for the current level
    Hint,

    /// Show platform information
    Info,

    /// Show the leaderboard
    Leaderboard,

    /// Show your submission history
    Submissions,

    /// List levels and completion state
    Levels,

    /// Live view with a running countdown (Ctrl-C to leave)
    Run,
}

#[derive(Args)]
struct SubmitArgs {
    flag: String,
}

impl ChallengeCmd {
    pub async fn execute(&self, store: &SessionStore) -> Result<()> {
        // Info and the leaderboard are open to any authenticated user; the
        // runner itself needs approval.
        let requirement = match self.command {
            ChallengeCommands::Info | ChallengeCommands::Leaderboard => {
                RouteRequirement::Authenticated
            }
            _ => RouteRequirement::Approved,
        };
        ensure(store, requirement).await?;

        let api: Arc<dyn ChallengeApi> = store.client();
        match &self.command {
            ChallengeCommands::Status => self.show_status(store, api).await,
            ChallengeCommands::Start => self.start(store, api).await,
            ChallengeCommands::Submit(args) => self.submit(store, api, &args.flag).await,
            ChallengeCommands::Hint => match api.hint().await {
                Ok(hint) => {
                    println!("Level {} hint: {}", hint.level, hint.hint);
                    Ok(())
                }
                Err(e) => Err(surface(store, e).await),
            },
            ChallengeCommands::Info => match api.platform_info().await {
                Ok(info) => {
                    println!("{}", info.name);
                    if let Some(description) = &info.description {
                        println!("{description}");
                    }
                    println!(
                        "{} levels, time limit {}",
                        info.total_levels,
                        format_clock(info.time_limit_seconds)
                    );
                    Ok(())
                }
                Err(e) => Err(surface(store, e).await),
            },
            ChallengeCommands::Leaderboard => match api.leaderboard().await {
                Ok(entries) => {
                    if entries.is_empty() {
                        println!("Leaderboard is empty.");
                    }
                    for entry in entries {
                        println!(
                            "{:>3}. {:<20} level {:>2}  {} completed{}",
                            entry.rank,
                            entry.username,
                            entry.current_level,
                            entry.completed_levels,
                            if entry.finished { "  [finished]" } else { "" }
                        );
                    }
                    Ok(())
                }
                Err(e) => Err(surface(store, e).await),
            },
            ChallengeCommands::Submissions => match api.submissions().await {
                Ok(records) => {
                    if records.is_empty() {
                        println!("No submissions yet.");
                    }
                    for record in records {
                        println!(
                            "level {:>2}  {}  {}",
                            record.level,
                            if record.correct { "correct  " } else { "incorrect" },
                            record.submitted_at.format("%Y-%m-%d %H:%M:%S UTC")
                        );
                    }
                    Ok(())
                }
                Err(e) => Err(surface(store, e).await),
            },
            ChallengeCommands::Levels => match api.levels().await {
                Ok(levels) => {
                    for level in levels {
                        println!(
                            "[{}] level {:>2}: {}",
                            if level.completed { "x" } else { " " },
                            level.level,
                            level.title
                        );
                    }
                    Ok(())
                }
                Err(e) => Err(surface(store, e).await),
            },
            ChallengeCommands::Run => self.run(store, api).await,
        }
    }

    async fn show_status(&self, store: &SessionStore, api: Arc<dyn ChallengeApi>) -> Result<()> {
        let (mut controller, _events) = ChallengeController::new(api);
        match controller.load().await {
            Ok(state) => {
                print_view(&controller, state);
                Ok(())
            }
            Err(e) => Err(surface(store, e).await),
        }
    }

    async fn start(&self, store: &SessionStore, api: Arc<dyn ChallengeApi>) -> Result<()> {
        match api.can_start().await {
            Ok(answer) if !answer.allowed => {
                anyhow::bail!(
                    "cannot start: {}",
                    answer.reason.unwrap_or_else(|| "not allowed".to_string())
                );
            }
            Ok(_) => {}
            Err(e) => return Err(surface(store, e).await),
        }

        let (mut controller, _events) = ChallengeController::new(api);
        match controller.start().await {
            Ok(state) => {
                print_view(&controller, state);
                Ok(())
            }
            Err(e) => Err(surface(store, e).await),
        }
    }

    async fn submit(
        &self,
        store: &SessionStore,
        api: Arc<dyn ChallengeApi>,
        flag: &str,
    ) -> Result<()> {
        let (mut controller, _events) = ChallengeController::new(api);
        if let Err(e) = controller.load().await {
            return Err(surface(store, e).await);
        }
        match controller.submit_flag(flag).await {
            Ok(SubmitOutcome::Completed) => {
                println!("Correct! You completed the challenge. Congratulations!");
                Ok(())
            }
            Ok(SubmitOutcome::Advanced { next_level }) => {
                println!(
                    "Correct! Advancing to level {next_level}. Time remaining: {}",
                    format_clock(controller.seconds_remaining())
                );
                Ok(())
            }
            Ok(SubmitOutcome::Incorrect { total_attempts }) => {
                match total_attempts {
                    Some(n) => println!("Incorrect flag ({n} attempts so far)."),
                    None => println!("Incorrect flag."),
                }
                Ok(())
            }
            Ok(SubmitOutcome::Expired) => {
                println!("Time is up. The challenge has ended.");
                Ok(())
            }
            Ok(SubmitOutcome::AlreadyEnded(_)) => {
                println!("The challenge has already ended.");
                Ok(())
            }
            Err(e) => Err(surface(store, e).await),
        }
    }

    /// Interactive view: renders the ticking clock until the run ends or the
    /// user leaves with Ctrl-C.
    async fn run(&self, store: &SessionStore, api: Arc<dyn ChallengeApi>) -> Result<()> {
        let (mut controller, mut events) = ChallengeController::new(api);
        let state = match controller.load().await {
            Ok(state) => state,
            Err(e) => return Err(surface(store, e).await),
        };
        print_view(&controller, state);
        if state != ViewState::Active {
            return Ok(());
        }

        let mut remaining = controller.subscribe_countdown();
        loop {
            tokio::select! {
                changed = remaining.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let seconds = *remaining.borrow();
                    print!("\r  time remaining: {} ", format_clock(seconds));
                    let _ = std::io::stdout().flush();
                }
                event = events.recv() => {
                    if let Some(ChallengeEvent::TimerExpired) = event {
                        controller.mark_expired();
                        println!("\nTime is up. The challenge has ended.");
                    }
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    break;
                }
            }
        }
        Ok(())
    }
}

fn print_view(controller: &ChallengeController, state: ViewState) {
    match state {
        ViewState::NotStarted => {
            println!("Challenge not started. Run `ctf-console challenge start` to begin.");
        }
        ViewState::Active => {
            if let Some(status) = controller.status() {
                println!(
                    "Level {} of your run ({} attempts, {} levels done)",
                    status.current_level,
                    status.total_attempts,
                    status.completed_levels.len()
                );
            }
            if let Some(current) = controller.current() {
                println!("\n{}: {}", current.title, current.description);
                if let Some(format) = &current.flag_format {
                    println!("Flag format: {format}");
                }
            }
            println!(
                "\nTime remaining: {}",
                format_clock(controller.seconds_remaining())
            );
        }
        ViewState::EndedExpired => {
            println!("Time is up. The challenge has ended.");
        }
        ViewState::EndedCompleted => {
            println!("Challenge completed. Congratulations!");
        }
    }
}

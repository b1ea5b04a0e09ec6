use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ctf_console_admin::AdminMonitor;
use ctf_console_api_client::{AdminApi, NewChallenge, PlatformConfig};
use ctf_console_session::{RouteRequirement, SessionStore};
use std::sync::Arc;
use uuid::Uuid;

use crate::{ensure, surface};

#[derive(Parser)]
pub struct AdminCmd {
    #[command(subcommand)]
    command: AdminCommands,
}

#[derive(Parser)]
enum AdminCommands {
    /// List registered users
    Users,

    /// Approve a user account
    Approve(UserArgs),

    /// Revoke a user's approval
    Disapprove(UserArgs),

    /// Reset a user's challenge progress
    Reset(UserArgs),

    /// Delete a user account
    Delete(UserArgs),

    /// Show platform statistics
    Stats,

    /// Read or update platform configuration
    Config(ConfigArgs),

    /// Manage challenge definitions
    Challenges {
        #[command(subcommand)]
        command: ChallengeAdminCommands,
    },

    /// Live monitoring of active challenge sessions (Ctrl-C to leave)
    Monitor,
}

#[derive(Args)]
struct UserArgs {
    /// User id
    id: Uuid,
}

#[derive(Args)]
struct ConfigArgs {
    /// Open or close registration
    #[arg(long)]
    registration_open: Option<bool>,

    /// Challenge time limit in seconds
    #[arg(long)]
    time_limit: Option<u64>,

    /// Maximum attempts per level (0 clears the limit)
    #[arg(long)]
    max_attempts: Option<u32>,
}

#[derive(Subcommand)]
enum ChallengeAdminCommands {
    /// List challenge definitions
    List,

    /// Create a challenge definition
    Create(ChallengeDefArgs),

    /// Update a challenge definition
    Update {
        id: Uuid,
        #[command(flatten)]
        definition: ChallengeDefArgs,
    },

    /// Delete a challenge definition
    Delete { id: Uuid },
}

#[derive(Args)]
struct ChallengeDefArgs {
    #[arg(long)]
    level: u32,

    #[arg(long)]
    title: String,

    #[arg(long)]
    description: String,

    #[arg(long)]
    flag: String,
}

impl ChallengeDefArgs {
    fn to_new_challenge(&self) -> NewChallenge {
        NewChallenge {
            level: self.level,
            title: self.title.clone(),
            description: self.description.clone(),
            flag: self.flag.clone(),
        }
    }
}

impl AdminCmd {
    pub async fn execute(&self, store: &SessionStore) -> Result<()> {
        ensure(store, RouteRequirement::Admin).await?;
        let api: Arc<dyn AdminApi> = store.client();

        match &self.command {
            AdminCommands::Users => match api.users().await {
                Ok(users) => {
                    for user in users {
                        println!(
                            "{}  {:<20} {:<8} {}{}",
                            user.id,
                            user.username,
                            match user.role {
                                ctf_console_api_client::Role::Admin => "admin",
                                ctf_console_api_client::Role::User => "user",
                            },
                            if user.approved { "approved" } else { "pending" },
                            user.current_level
                                .map(|l| format!("  level {l}"))
                                .unwrap_or_default()
                        );
                    }
                    Ok(())
                }
                Err(e) => Err(surface(store, e).await),
            },
            AdminCommands::Approve(args) => {
                if let Err(e) = api.approve_user(args.id).await {
                    return Err(surface(store, e).await);
                }
                println!("User approved.");
                Ok(())
            }
            AdminCommands::Disapprove(args) => {
                if let Err(e) = api.disapprove_user(args.id).await {
                    return Err(surface(store, e).await);
                }
                println!("User approval revoked.");
                Ok(())
            }
            AdminCommands::Reset(args) => {
                if let Err(e) = api.reset_user(args.id).await {
                    return Err(surface(store, e).await);
                }
                println!("User progress reset.");
                Ok(())
            }
            AdminCommands::Delete(args) => {
                if let Err(e) = api.delete_user(args.id).await {
                    return Err(surface(store, e).await);
                }
                println!("User deleted.");
                Ok(())
            }
            AdminCommands::Stats => match api.stats().await {
                Ok(stats) => {
                    println!("Users:             {}", stats.total_users);
                    println!("Approved:          {}", stats.approved_users);
                    println!("Active sessions:   {}", stats.active_sessions);
                    println!("Completed runs:    {}", stats.completed_users);
                    println!("Total submissions: {}", stats.total_submissions);
                    Ok(())
                }
                Err(e) => Err(surface(store, e).await),
            },
            AdminCommands::Config(args) => self.config(store, api, args).await,
            AdminCommands::Challenges { command } => self.challenges(store, api, command).await,
            AdminCommands::Monitor => self.monitor(store, api).await,
        }
    }

    async fn config(
        &self,
        store: &SessionStore,
        api: Arc<dyn AdminApi>,
        args: &ConfigArgs,
    ) -> Result<()> {
        let mut config = match api.config().await {
            Ok(config) => config,
            Err(e) => return Err(surface(store, e).await),
        };

        let updating = args.registration_open.is_some()
            || args.time_limit.is_some()
            || args.max_attempts.is_some();
        if updating {
            if let Some(open) = args.registration_open {
                config.registration_open = open;
            }
            if let Some(limit) = args.time_limit {
                config.challenge_time_limit_seconds = limit;
            }
            if let Some(attempts) = args.max_attempts {
                config.max_attempts_per_level = (attempts > 0).then_some(attempts);
            }
            config = match api.update_config(&config).await {
                Ok(config) => config,
                Err(e) => return Err(surface(store, e).await),
            };
        }
        print_config(&config);
        Ok(())
    }

    async fn challenges(
        &self,
        store: &SessionStore,
        api: Arc<dyn AdminApi>,
        command: &ChallengeAdminCommands,
    ) -> Result<()> {
        match command {
            ChallengeAdminCommands::List => match api.challenges().await {
                Ok(challenges) => {
                    for c in challenges {
                        println!(
                            "{}  level {:>2}  {:<30} {}",
                            c.id,
                            c.level,
                            c.title,
                            if c.active { "active" } else { "inactive" }
                        );
                    }
                    Ok(())
                }
                Err(e) => Err(surface(store, e).await),
            },
            ChallengeAdminCommands::Create(definition) => {
                match api.create_challenge(&definition.to_new_challenge()).await {
                    Ok(created) => {
                        println!("Created challenge {} (level {}).", created.id, created.level);
                        Ok(())
                    }
                    Err(e) => Err(surface(store, e).await),
                }
            }
            ChallengeAdminCommands::Update { id, definition } => {
                match api
                    .update_challenge(*id, &definition.to_new_challenge())
                    .await
                {
                    Ok(updated) => {
                        println!("Updated challenge {} (level {}).", updated.id, updated.level);
                        Ok(())
                    }
                    Err(e) => Err(surface(store, e).await),
                }
            }
            ChallengeAdminCommands::Delete { id } => match api.delete_challenge(*id).await {
                Ok(()) => {
                    println!("Deleted challenge {id}.");
                    Ok(())
                }
                Err(e) => Err(surface(store, e).await),
            },
        }
    }

    /// Live monitoring: background polling keeps the rows fresh while the
    /// render loop repaints every few seconds.
    async fn monitor(&self, store: &SessionStore, api: Arc<dyn AdminApi>) -> Result<()> {
        let mut monitor = AdminMonitor::new(api);
        if let Err(e) = monitor.poll_once().await {
            return Err(surface(store, e).await);
        }
        monitor.spawn_polling();
        render_rows(&monitor).await;

        let mut repaint = tokio::time::interval(ctf_console_admin::DEFAULT_POLL_INTERVAL);
        repaint.tick().await;
        loop {
            tokio::select! {
                _ = repaint.tick() => {
                    render_rows(&monitor).await;
                }
                _ = tokio::signal::ctrl_c() => {
                    monitor.stop();
                    break;
                }
            }
        }
        Ok(())
    }
}

fn print_config(config: &PlatformConfig) {
    println!(
        "registration: {}",
        if config.registration_open { "open" } else { "closed" }
    );
    println!("time limit:   {}s", config.challenge_time_limit_seconds);
    match config.max_attempts_per_level {
        Some(n) => println!("max attempts: {n} per level"),
        None => println!("max attempts: unlimited"),
    }
}

async fn render_rows(monitor: &AdminMonitor) {
    let rows = monitor.snapshot().await;
    if rows.is_empty() {
        println!("No active challenge sessions.");
        return;
    }
    for row in rows {
        let recent: Vec<String> = row
            .last_submissions
            .iter()
            .map(|s| format!("L{}{}", s.level, if s.correct { "+" } else { "-" }))
            .collect();
        println!(
            "{:<20} level {:>2}  {}  [{}]",
            row.username,
            row.current_level,
            row.clock,
            recent.join(" ")
        );
    }
}

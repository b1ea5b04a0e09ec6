use anyhow::Result;
use clap::{Parser, Subcommand};
use ctf_console_api_client::{ApiClientBuilder, ApiError};
use ctf_console_session::{Access, RouteRequirement, SessionStore};
use std::sync::Arc;
use tracing::warn;

mod admin;
mod auth;
mod challenge;
mod config;

use admin::AdminCmd;
use auth::AuthCmd;
use challenge::ChallengeCmd;
use config::ConsoleConfig;

#[derive(Parser)]
#[command(name = "ctf-console")]
#[command(about = "Console for the CTF training platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account and session management
    Auth(AuthCmd),

    /// Challenge runner
    Challenge(ChallengeCmd),

    /// Admin console
    Admin(AdminCmd),
}

/// Routing guard: commands state what they need and bail with a uniform
/// message instead of scattering role checks.
pub(crate) async fn ensure(store: &SessionStore, requirement: RouteRequirement) -> Result<()> {
    match store.check(requirement).await {
        Access::Granted => Ok(()),
        Access::NeedsLogin => anyhow::bail!("not logged in (run `ctf-console auth login`)"),
        Access::PendingApproval => anyhow::bail!("account is pending approval by an administrator"),
        Access::AdminOnly => anyhow::bail!("admin access required"),
    }
}

/// Surface an API failure: a 401 destroys the session before the error is
/// reported, everything else passes through untouched.
pub(crate) async fn surface(store: &SessionStore, error: ApiError) -> anyhow::Error {
    let error = store.observe_error(error).await;
    if error.is_unauthorized() {
        anyhow::anyhow!("session expired, please log in again")
    } else {
        anyhow::anyhow!(error)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse first so `--help` and argument errors never touch the network.
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ConsoleConfig::load()?;
    let client = Arc::new(
        ApiClientBuilder::new()
            .base_url(config.api_url.clone())
            .timeout(config.request_timeout)
            .build()?,
    );
    let store = Arc::new(SessionStore::new(client, config.token_file.clone()));

    // Best-effort restore; commands re-check their guards anyway.
    if let Err(e) = store.restore().await {
        warn!(error = %e, "could not restore session");
    }

    match cli.command {
        Commands::Auth(cmd) => cmd.execute(&store).await,
        Commands::Challenge(cmd) => cmd.execute(&store).await,
        Commands::Admin(cmd) => cmd.execute(&store).await,
    }
}

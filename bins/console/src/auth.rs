use anyhow::Result;
use clap::{Args, Parser};
use ctf_console_api_client::Role;
use ctf_console_session::SessionStore;

use crate::surface;

#[derive(Parser)]
pub struct AuthCmd {
    #[command(subcommand)]
    command: AuthCommands,
}

#[derive(Parser)]
enum AuthCommands {
    /// Log in and persist the session token
    Login(CredentialArgs),

    /// Register a new account
    Register(CredentialArgs),

    /// Log out and discard the session token
    Logout,

    /// Show the current identity
    Whoami,

    /// Change the account password
    ChangePassword(ChangePasswordArgs),
}

#[derive(Args)]
struct CredentialArgs {
    #[arg(short, long)]
    username: String,

    #[arg(short, long)]
    password: String,
}

#[derive(Args)]
struct ChangePasswordArgs {
    /// Current password
    #[arg(long)]
    current: String,

    /// New password
    #[arg(long)]
    new: String,
}

impl AuthCmd {
    pub async fn execute(&self, store: &SessionStore) -> Result<()> {
        match &self.command {
            AuthCommands::Login(args) => {
                let session = store
                    .login(&args.username, &args.password)
                    .await
                    .map_err(|e| anyhow::anyhow!(e))?;
                println!("Logged in as {}", session.username);
                if !session.approved && session.role != Role::Admin {
                    println!("Your account is awaiting administrator approval.");
                }
                Ok(())
            }
            AuthCommands::Register(args) => {
                let session = store
                    .register(&args.username, &args.password)
                    .await
                    .map_err(|e| anyhow::anyhow!(e))?;
                println!("Registered as {}", session.username);
                if !session.approved {
                    println!("Your account is awaiting administrator approval.");
                }
                Ok(())
            }
            AuthCommands::Logout => {
                store.logout().await;
                println!("Logged out.");
                Ok(())
            }
            AuthCommands::Whoami => {
                match store.current().await {
                    Some(session) => {
                        let role = match session.role {
                            Role::Admin => "admin",
                            Role::User => "user",
                        };
                        println!(
                            "{} ({}, {})",
                            session.username,
                            role,
                            if session.approved {
                                "approved"
                            } else {
                                "pending approval"
                            }
                        );
                    }
                    None => println!("Not logged in."),
                }
                Ok(())
            }
            AuthCommands::ChangePassword(args) => {
                if let Err(e) = store.change_password(&args.current, &args.new).await {
                    return Err(surface(store, e).await);
                }
                println!("Password changed.");
                Ok(())
            }
        }
    }
}

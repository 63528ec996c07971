//! Auth command handlers
//!
//! Log in, register, and inspect the current account. The CLI does not
//! persist tokens; `auth login` prints the access token for the caller to
//! export as `READCAST_TOKEN`.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use readcast_core::dto::auth::{LoginRequest, RegisterRequest, Session};

use crate::config::Config;

/// Auth subcommands
#[derive(Subcommand)]
pub enum AuthCommands {
    /// Log in and print an access token
    Login {
        /// Email address or username
        #[arg(long)]
        user: String,

        /// Password
        #[arg(long, env = "READCAST_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Register a new account
    Register {
        #[arg(long)]
        email: String,

        #[arg(long)]
        username: String,

        #[arg(long, env = "READCAST_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the authenticated user's profile
    Me,
}

/// Handle auth commands
pub async fn handle_auth_command(command: AuthCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        AuthCommands::Login { user, password } => {
            let session = client
                .login(LoginRequest {
                    email_or_username: user,
                    password,
                })
                .await?;
            print_session(&session);
            Ok(())
        }
        AuthCommands::Register {
            email,
            username,
            password,
        } => {
            let session = client
                .register(RegisterRequest {
                    email,
                    username,
                    password,
                })
                .await?;
            println!("{}", "Account created.".green());
            print_session(&session);
            Ok(())
        }
        AuthCommands::Me => {
            config
                .token
                .as_ref()
                .context("not logged in, set READCAST_TOKEN or pass --token")?;
            let account = client.me().await?;

            println!("{}", format!("Account {}", account.id).bold());
            println!("  Email:    {}", account.email);
            println!("  Username: {}", account.username);
            if let Some(full_name) = &account.full_name {
                println!("  Name:     {full_name}");
            }
            Ok(())
        }
    }
}

fn print_session(session: &Session) {
    if let Some(user) = &session.user {
        println!("{}", format!("Logged in as {}", user.username).green());
    }
    println!("  Access token:  {}", session.access_token);
    if let Some(refresh) = &session.refresh_token {
        println!("  Refresh token: {refresh}");
    }
    println!(
        "{}",
        "Export the access token as READCAST_TOKEN to authenticate later calls.".dimmed()
    );
}

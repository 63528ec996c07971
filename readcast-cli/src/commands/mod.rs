//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod auth;
mod convert;
mod health;
mod job;

pub use auth::AuthCommands;
pub use job::JobCommands;

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Convert a PDF into an audiobook and follow progress
    Convert {
        /// Path to the PDF file
        file: PathBuf,

        /// Narrator voice
        #[arg(long, default_value = "Rachel")]
        voice: String,

        /// Source language
        #[arg(long, default_value = "fra")]
        lang: String,

        /// Skip the event stream and poll for status instead
        #[arg(long)]
        no_stream: bool,

        /// Upload size limit in MiB
        #[arg(long, default_value_t = 100)]
        max_mib: u64,
    },
    /// Job management
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Account management
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Check backend availability
    Health,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Convert {
            file,
            voice,
            lang,
            no_stream,
            max_mib,
        } => convert::handle_convert(config, file, voice, lang, no_stream, max_mib).await,
        Commands::Job { command } => job::handle_job_command(command, config).await,
        Commands::Auth { command } => auth::handle_auth_command(command, config).await,
        Commands::Health => health::handle_health(config).await,
    }
}

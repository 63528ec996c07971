//! Job command handlers
//!
//! Handles job-related CLI commands: details, live watching, and history.

use anyhow::{Result, bail};
use clap::Subcommand;
use colored::*;
use readcast_client::{JobStatus, JobUpdate, ReadcastClient, WatchEvent, WatchOptions};
use readcast_core::dto::job::JobSummary;

use crate::config::Config;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Get job details
    Get {
        /// Job id
        id: String,

        /// Print the normalized record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Follow a job's status until it finishes
    Watch {
        /// Job id
        id: String,

        /// Skip the event stream and poll for status instead
        #[arg(long)]
        no_stream: bool,
    },
    /// List recent jobs
    History,
}

/// Handle job commands
///
/// Routes job subcommands to their respective handlers.
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        JobCommands::Get { id, json } => get_job(&client, &id, json).await,
        JobCommands::Watch { id, no_stream } => watch_job(&client, &id, no_stream).await,
        JobCommands::History => history(&client).await,
    }
}

/// Get and display a single job
async fn get_job(client: &ReadcastClient, id: &str, json: bool) -> Result<()> {
    let update = client.get_job(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&update)?);
        return Ok(());
    }

    print_job_details(&update);
    Ok(())
}

/// Follow a job live and report the outcome
async fn watch_job(client: &ReadcastClient, id: &str, no_stream: bool) -> Result<()> {
    println!("{}", format!("Watching job {}...", id).bold());

    let last = follow(client, id, !no_stream).await?;

    if last.status == JobStatus::Error {
        bail!(
            "conversion failed: {}",
            last.error.as_deref().unwrap_or("unknown error")
        );
    }

    print_artifacts(&last);
    Ok(())
}

/// List recent jobs
async fn history(client: &ReadcastClient) -> Result<()> {
    let jobs = client.job_history().await?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in jobs {
            print_job_summary(&job);
        }
    }

    Ok(())
}

/// Subscribe to a job and drain updates until it terminates.
///
/// Prints each update as it arrives and returns the final one. A
/// transport failure (the subscription's, not the job's) is an error.
pub(crate) async fn follow(
    client: &ReadcastClient,
    job_id: &str,
    streaming: bool,
) -> Result<JobUpdate> {
    let opts = WatchOptions {
        streaming,
        ..WatchOptions::default()
    };
    let (handle, mut events) = client.watch_job(job_id, opts);

    let mut last: Option<JobUpdate> = None;
    while let Some(event) = events.recv().await {
        match event {
            WatchEvent::Update(update) => {
                render_update(&update);
                let terminal = update.is_terminal();
                last = Some(update);
                if terminal {
                    break;
                }
            }
            WatchEvent::TransportError(err) => {
                bail!("lost contact with the backend: {err}");
            }
        }
    }
    handle.wait().await;

    match last {
        Some(update) => Ok(update),
        None => bail!("subscription ended without receiving any update"),
    }
}

/// Print one live update line
pub(crate) fn render_update(update: &JobUpdate) {
    match update.progress {
        Some(pct) => println!(
            "  {} {}",
            colorize_status(&update.status),
            format!("{pct:>3}%").dimmed()
        ),
        None => println!("  {}", colorize_status(&update.status)),
    }
    if let Some(error) = &update.error {
        println!("  {}", error.red());
    }
}

/// Print full job details
fn print_job_details(update: &JobUpdate) {
    println!("{}", format!("Job {}", update.id).bold());
    println!("  Status:   {}", colorize_status(&update.status));
    if let Some(pct) = update.progress {
        println!("  Progress: {pct}%");
    }
    if let Some(error) = &update.error {
        println!("  Error:    {}", error.red());
    }
    if let Some(preview) = &update.preview_text {
        println!("\n{}", "Preview:".bold());
        println!("{}", preview.dimmed());
    }
    print_artifacts(update);
}

/// Print artifact URLs, when present
pub(crate) fn print_artifacts(update: &JobUpdate) {
    if let Some(url) = &update.output_mp3_url {
        println!("  MP3:          {url}");
    }
    if let Some(url) = &update.output_m4b_url {
        println!("  M4B:          {url}");
    }
    if let Some(url) = &update.download_mp3_url {
        println!("  MP3 download: {url}");
    }
    if let Some(url) = &update.download_m4b_url {
        println!("  M4B download: {url}");
    }
}

/// Print a one-line job summary
fn print_job_summary(job: &JobSummary) {
    let created = job
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());

    println!(
        "{}  {}  {}  {}",
        job.id.dimmed(),
        created,
        colorize_status(&job.status),
        job.input_filename.as_deref().unwrap_or("-"),
    );
}

/// Colorize job status for display
fn colorize_status(status: &JobStatus) -> colored::ColoredString {
    let status_str = status.to_string();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::Processing => status_str.cyan(),
        JobStatus::Done => status_str.green(),
        JobStatus::Error => status_str.red(),
    }
}

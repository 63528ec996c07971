//! Convert command: upload a PDF and follow the job to completion.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use colored::*;
use readcast_client::{JobStatus, JobUpload};
use readcast_core::validate::UploadLimits;

use crate::commands::job::{follow, print_artifacts};
use crate::config::Config;

pub async fn handle_convert(
    config: &Config,
    file: PathBuf,
    voice: String,
    lang: String,
    no_stream: bool,
    max_mib: u64,
) -> Result<()> {
    let filename = file
        .file_name()
        .and_then(|name| name.to_str())
        .context("file path has no usable file name")?
        .to_string();
    let bytes = tokio::fs::read(&file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let client = config.client();
    let limits = UploadLimits {
        max_bytes: max_mib * 1024 * 1024,
    };
    let created = client
        .create_job(
            JobUpload::new(filename, bytes).voice(voice).lang(lang),
            &limits,
        )
        .await?;

    println!("{} {}", "Created job".bold(), created.id);

    let last = follow(&client, &created.id, !no_stream).await?;

    match last.status {
        JobStatus::Done => {
            println!("{}", "Conversion finished:".bold());
            print_artifacts(&last);
            Ok(())
        }
        _ => bail!(
            "conversion failed: {}",
            last.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

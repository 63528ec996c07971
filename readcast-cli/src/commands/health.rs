//! Health command handler

use anyhow::Result;
use colored::*;

use crate::config::Config;

/// Check backend availability and print the result
pub async fn handle_health(config: &Config) -> Result<()> {
    let client = config.client();
    let health = client.health().await?;

    if health.is_ok() {
        println!("{} Backend at {} is healthy", "✓".green(), config.api_url);
    } else {
        println!(
            "{} Backend at {} reports status {:?}",
            "⚠".yellow(),
            config.api_url,
            health.status
        );
    }

    Ok(())
}

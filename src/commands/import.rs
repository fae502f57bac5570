use std::path::Path;

use anyhow::{Context, Result};
use icsync_remote::{AuthClient, RemoteConfig, SyncClient};
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

use super::read_ics;

pub async fn run(cancel: &CancellationToken, calendar_id: &str, file: &Path) -> Result<()> {
    let ics = read_ics(file)?;

    let config = RemoteConfig::load()?;
    let sync = SyncClient::new(AuthClient::new(config)?);

    let report = sync
        .import_ics(cancel, calendar_id, &ics)
        .await
        .with_context(|| format!("Failed to import {} into '{}'", file.display(), calendar_id))?;

    for warning in &report.warnings {
        eprintln!("  {}", warning.to_string().yellow());
    }

    println!(
        "{}",
        format!(
            "Imported {} event(s) into '{}'",
            report.inserted_ids.len(),
            calendar_id
        )
        .green()
    );

    Ok(())
}

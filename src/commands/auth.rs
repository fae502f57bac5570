use anyhow::{Context, Result};
use icsync_remote::{AuthClient, RemoteConfig};
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

pub async fn run(cancel: &CancellationToken) -> Result<()> {
    let config = RemoteConfig::load()?;
    let client = AuthClient::new(config)?;

    let token = client
        .ensure_token(cancel)
        .await
        .context("Authorization failed")?;

    println!(
        "{}",
        format!(
            "Authorized. Token valid until {}",
            token.expiry.format("%Y-%m-%d %H:%M UTC")
        )
        .green()
    );
    println!("  Saved to {}", client.store().path().display());

    Ok(())
}

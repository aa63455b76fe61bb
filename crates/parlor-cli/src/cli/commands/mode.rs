//! Mode command handlers.

use anyhow::{Context, Result};
use parlor_core::chats::{Mode, ModeStatus};
use parlor_core::client::BackendClient;

pub async fn get(client: &BackendClient) -> Result<()> {
    let status = client.mode().await.context("get mode")?;
    print_status(&status);
    Ok(())
}

pub async fn set(client: &BackendClient, mode: Mode) -> Result<()> {
    let status = client
        .set_mode(mode)
        .await
        .with_context(|| format!("set mode to {mode}"))?;
    print_status(&status);
    Ok(())
}

pub async fn toggle(client: &BackendClient) -> Result<()> {
    let current = client.mode().await.context("get mode")?;
    set(client, current.mode.toggle()).await
}

fn print_status(status: &ModeStatus) {
    println!("Mode: {}", status.mode);
    if let Some(detected) = &status.detected_status {
        println!("Detected: {detected}");
    }
}

//! The `send` command: authenticate, then submit a folder of messages
//!
//! Loads `config.json` and the message files from the input folder, runs
//! the capability probe and the authorization chain, submits the whole
//! batch concurrently and reports every message outcome individually. A
//! batch with some failed messages is not a failed run.

use std::path::{Path, PathBuf};

use crate::batch::{load_messages, send_batch, MessageOutcome};
use crate::client::MessageClient;
use crate::config::ClientConfig;
use crate::error::{CourierError, Result};

/// Runs the `send` subcommand.
///
/// # Arguments
///
/// * `input` - Folder holding `config.json` and the `*.json` messages.
/// * `out` - Optional folder to write per-message server responses into.
///
/// # Errors
///
/// Fails when configuration or messages cannot be loaded, when the server
/// does not advertise the required scope, or when authorization fails.
/// Individual submission failures are reported, not propagated.
pub async fn run_send(input: PathBuf, out: Option<PathBuf>) -> Result<()> {
    let config_path = input.join("config.json");
    if !config_path.is_file() {
        return Err(CourierError::Config(format!(
            "no config.json in messages folder {}",
            input.display()
        ))
        .into());
    }
    let config = ClientConfig::load(&config_path)?;

    let messages = load_messages(&input)?;
    tracing::info!("loaded {} message(s) from {}", messages.len(), input.display());

    let mut client = MessageClient::new(config)?;

    if !client.can_send_messages().await? {
        anyhow::bail!(
            "authorization server does not advertise the {} scope",
            crate::auth::PROCESS_MESSAGE_SCOPE
        );
    }

    let session = client.authorize().await?;
    let outcomes = send_batch(&session, &messages).await;

    if let Some(out_dir) = out {
        write_responses(&out_dir, &outcomes)?;
    }

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    tracing::info!(
        "batch complete: {} succeeded, {} failed",
        outcomes.len() - failed,
        failed
    );

    Ok(())
}

/// Writes each successful response body into the output folder, one file
/// per message, named after the message file.
fn write_responses(out_dir: &Path, outcomes: &[MessageOutcome]) -> Result<()> {
    std::fs::create_dir_all(out_dir).map_err(CourierError::Io)?;

    for outcome in outcomes {
        if let Ok(receipt) = &outcome.result {
            let path = out_dir.join(&outcome.file_name);
            std::fs::write(&path, &receipt.body).map_err(CourierError::Io)?;
            tracing::debug!("wrote response for {} to {}", outcome.file_name, path.display());
        }
    }

    Ok(())
}

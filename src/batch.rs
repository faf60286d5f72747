//! Batch loading and submission of FHIR messages
//!
//! Messages are independent of each other: the whole batch is submitted
//! concurrently against the read-only authorized session, completions
//! arrive in no particular order, and every outcome is reported on its
//! own. One failed message never cancels or fails the others, and nothing
//! is retried automatically; callers re-drive failed messages manually.

use std::path::{Path, PathBuf};

use futures::future::join_all;

use crate::client::AuthorizedSession;
use crate::error::{CourierError, Result};

/// One message file read from the input folder.
///
/// The body is an opaque serialized FHIR message; the client forwards it
/// without interpretation.
#[derive(Debug, Clone)]
pub struct MessagePayload {
    /// File name within the input folder, used in outcome reporting.
    pub file_name: String,

    /// Raw message body.
    pub body: String,
}

/// The server's answer to one successful submission.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    /// HTTP status code of the response.
    pub status: u16,

    /// Raw response body, kept for optional artifact writing.
    pub body: String,
}

/// Outcome of one message submission, success or error.
#[derive(Debug)]
pub struct MessageOutcome {
    /// File name of the submitted message.
    pub file_name: String,

    /// Receipt on success, error text on failure.
    pub result: std::result::Result<SubmissionReceipt, String>,
}

impl MessageOutcome {
    /// Whether this message was accepted by the server.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Collects the message files from an input folder.
///
/// Regular `*.json` files are loaded; subdirectories, `config.json` and
/// empty files are skipped.
///
/// # Errors
///
/// Returns [`CourierError::Io`] when the folder cannot be read and
/// [`CourierError::Config`] when it contains no message files.
pub fn load_messages(input: &Path) -> Result<Vec<MessagePayload>> {
    let entries = std::fs::read_dir(input).map_err(|e| {
        CourierError::Config(format!("invalid path to messages folder {}: {e}", input.display()))
    })?;

    let mut messages = Vec::new();
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    // Stable reporting order; submissions themselves are unordered.
    paths.sort();

    for path in paths {
        if path.is_dir() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if file_name == "config.json" || !file_name.ends_with(".json") {
            continue;
        }

        let body = std::fs::read_to_string(&path).map_err(CourierError::Io)?;
        if body.trim().is_empty() {
            tracing::warn!("skipping empty message file {file_name}");
            continue;
        }

        messages.push(MessagePayload {
            file_name: file_name.to_string(),
            body,
        });
    }

    if messages.is_empty() {
        return Err(CourierError::Config(format!(
            "no messages found in folder {}",
            input.display()
        ))
        .into());
    }

    Ok(messages)
}

/// Submits a batch of messages concurrently.
///
/// All submissions run at once against the shared read-only session. A
/// non-success HTTP status or a transport error becomes an error outcome
/// for that message only; the returned vector always holds one outcome
/// per input message, in input order.
pub async fn send_batch(
    session: &AuthorizedSession,
    messages: &[MessagePayload],
) -> Vec<MessageOutcome> {
    let submissions = messages.iter().map(|message| async move {
        let result = submit_one(session, message).await;
        match &result {
            Ok(receipt) => {
                tracing::info!("{} - Success! ({})", message.file_name, receipt.status);
            }
            Err(reason) => {
                tracing::error!("{} - {reason}", message.file_name);
            }
        }
        MessageOutcome {
            file_name: message.file_name.clone(),
            result,
        }
    });

    join_all(submissions).await
}

/// Submits one message and classifies the response.
async fn submit_one(
    session: &AuthorizedSession,
    message: &MessagePayload,
) -> std::result::Result<SubmissionReceipt, String> {
    let response = session
        .process_message(&message.body)
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if status.is_success() {
        Ok(SubmissionReceipt {
            status: status.as_u16(),
            body,
        })
    } else {
        Err(format!("server returned {status}: {body}"))
    }
}

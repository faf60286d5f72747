//! fhir-courier - SMART-on-FHIR backend-services messaging client library
//!
//! This library authenticates a machine client against a SMART-on-FHIR
//! authorization server using the OAuth2 JWT-Bearer client-credentials
//! grant, then submits batches of FHIR message payloads to a
//! `$process-message` endpoint with the resulting bearer token.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: discovery, key material, assertion signing, token exchange
//! - `client`: the message client state machine and authorized session
//! - `batch`: message loading and concurrent batch submission
//! - `config`: configuration loading and validation
//! - `error`: error types and result aliases
//! - `cli` / `commands`: command-line interface and handlers
//!
//! # Example
//!
//! ```no_run
//! use fhir_courier::{ClientConfig, MessageClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::load("messages/config.json".as_ref())?;
//!     config.validate()?;
//!
//!     let mut client = MessageClient::new(config)?;
//!     if client.can_send_messages().await? {
//!         let session = client.authorize().await?;
//!         session.process_message(r#"{"resourceType": "Bundle"}"#).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod batch;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use batch::{load_messages, send_batch, MessageOutcome, MessagePayload};
pub use client::{AuthorizedSession, ClientState, MessageClient};
pub use config::ClientConfig;
pub use error::{CourierError, Result};

//! Error types for fhir-courier
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for fhir-courier operations
///
/// This enum encompasses all possible errors that can occur while probing
/// the authorization server, resolving key material, signing the client
/// assertion, exchanging it for an access token, and submitting messages.
#[derive(Error, Debug)]
pub enum CourierError {
    /// Missing or invalid required configuration field. Raised before any
    /// network call is attempted.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or missing SMART discovery document.
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Bad passphrase or corrupt PKCS#12 keystore.
    #[error("Keystore decryption error: {0}")]
    Decryption(String),

    /// Key material unusable for the requested signature algorithm.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Token exchange failed or the response carried no access token.
    #[error("Token error: {0}")]
    Token(String),

    /// An individual message POST failed. Reported per message, never
    /// fatal to the batch.
    #[error("Submission error: {0}")]
    Submission(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for fhir-courier operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

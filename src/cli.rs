//! Command-line interface definition for fhir-courier
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for batch message submission and PKCS#12 to JWK
//! conversion.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fhir-courier - SMART-on-FHIR backend-services messaging client
///
/// Authenticates with the JWT-Bearer client-credentials grant and submits
/// a folder of FHIR messages to a `$process-message` endpoint.
#[derive(Parser, Debug, Clone)]
#[command(name = "fhir-courier")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for fhir-courier
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Authenticate and submit a folder of FHIR messages
    Send {
        /// Path to the folder holding config.json and the message files
        path: PathBuf,

        /// Folder to write server responses into (one file per message)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Convert a PKCS#12 keystore into a private JWK file
    Convert {
        /// Path to the PKCS#12 keystore
        pkcs12: PathBuf,

        /// Passphrase protecting the keystore
        password: String,

        /// Path of the JWK file to write
        out: PathBuf,
    },
}

impl Cli {
    /// Parses command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

//! The `convert` command: PKCS#12 keystore to private JWK file
//!
//! Standalone counterpart of the key-resolution step: operators convert a
//! keystore once, inspect the JWK, and embed it in `config.json` instead
//! of shipping the keystore with every batch.

use std::path::{Path, PathBuf};

use crate::auth::keys::pkcs12_to_jwk;
use crate::error::{CourierError, Result};

/// Runs the `convert` subcommand.
///
/// # Errors
///
/// Fails with [`CourierError::Decryption`] on a bad passphrase or corrupt
/// keystore, and with [`CourierError::Io`] when the output file cannot be
/// written.
pub fn run_convert(pkcs12: &Path, password: &str, out: PathBuf) -> Result<()> {
    let jwk = pkcs12_to_jwk(pkcs12, password)?;

    let json = serde_json::to_string_pretty(&jwk).map_err(CourierError::Serialization)?;
    std::fs::write(&out, json).map_err(CourierError::Io)?;

    tracing::info!("wrote private JWK to {}", out.display());
    Ok(())
}

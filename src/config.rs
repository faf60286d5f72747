//! Client configuration for fhir-courier
//!
//! Configuration is read from a `config.json` file placed alongside the
//! message files. Field names follow the historical spelling used by the
//! on-disk format (`baseURL`, `clientId`, `pkcs12Pass`, ...).
//!
//! [`ClientConfig::validate`] enforces every invariant that must hold
//! before any network call is attempted: required fields are non-empty and
//! exactly one signing-key source is configured.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::auth::keys::Jwk;
use crate::error::{CourierError, Result};

/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default submission path appended to `baseURL`.
///
/// Deployments pin a FHIR version in the path (`/DSTU2/$process-message`,
/// `/R4/$process-message`); the path is configurable via `submissionPath`
/// rather than hard-coded.
pub const DEFAULT_SUBMISSION_PATH: &str = "/$process-message";

/// Signature algorithm for the client assertion.
///
/// RS384 is the default; RS256 remains accepted for compatibility with
/// older authorization server configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum AssertionAlg {
    /// RSASSA-PKCS1-v1_5 using SHA-384 (default).
    #[default]
    #[serde(rename = "RS384")]
    Rs384,

    /// RSASSA-PKCS1-v1_5 using SHA-256.
    #[serde(rename = "RS256")]
    Rs256,
}

impl AssertionAlg {
    /// Maps to the corresponding `jsonwebtoken` algorithm.
    pub fn to_jwt_algorithm(self) -> jsonwebtoken::Algorithm {
        match self {
            AssertionAlg::Rs384 => jsonwebtoken::Algorithm::RS384,
            AssertionAlg::Rs256 => jsonwebtoken::Algorithm::RS256,
        }
    }
}

/// Immutable client configuration loaded from `config.json`.
///
/// # Key material
///
/// Exactly one signing-key source must be configured: either a raw private
/// RSA JWK (`jwk`) or a PKCS#12 keystore reference (`pkcs12` +
/// `pkcs12Pass`). When both are present the raw JWK wins and the keystore
/// is never opened.
///
/// # TLS policy
///
/// `ssl_strict` defaults to `true`, meaning TLS certificates are verified
/// on every connection. Setting `"ssl_strict": false` is an explicit
/// opt-in to accepting invalid certificates and is only intended for test
/// environments.
///
/// # Examples
///
/// ```
/// use fhir_courier::config::ClientConfig;
///
/// let config: ClientConfig = serde_json::from_str(
///     r#"{
///         "baseURL": "https://fhir.example.com",
///         "clientId": "my-client",
///         "aud": "https://auth.example.com/token",
///         "jwk": {"kty": "RSA", "n": "AQAB", "e": "AQAB"}
///     }"#,
/// )
/// .unwrap();
///
/// assert!(config.ssl_strict);
/// assert_eq!(config.submission_path, "/$process-message");
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the FHIR resource server. Required.
    #[serde(default, rename = "baseURL")]
    pub base_url: String,

    /// OAuth client identifier, used as `iss` and `sub` in the assertion.
    /// Required.
    #[serde(default, rename = "clientId")]
    pub client_id: String,

    /// Intended audience for the client assertion. Required before a token
    /// can be requested.
    #[serde(default)]
    pub aud: String,

    /// Per-request timeout in milliseconds. Defaults to
    /// [`DEFAULT_TIMEOUT_MS`].
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Raw private RSA JWK to sign assertions with.
    #[serde(default)]
    pub jwk: Option<Jwk>,

    /// Path to a PKCS#12 keystore holding the signing key.
    #[serde(default)]
    pub pkcs12: Option<PathBuf>,

    /// Passphrase protecting the PKCS#12 keystore.
    #[serde(default, rename = "pkcs12Pass")]
    pub pkcs12_pass: Option<String>,

    /// Verify TLS certificates. Defaults to `true`; `false` accepts
    /// invalid certificates (test environments only).
    #[serde(default = "default_ssl_strict")]
    pub ssl_strict: bool,

    /// Explicit token endpoint override. When absent the endpoint is taken
    /// from the discovered SMART configuration.
    #[serde(default, rename = "tokenEndpoint")]
    pub token_endpoint: Option<String>,

    /// Path appended to `baseURL` for message submission.
    #[serde(default = "default_submission_path", rename = "submissionPath")]
    pub submission_path: String,

    /// Client assertion signature algorithm.
    #[serde(default)]
    pub alg: AssertionAlg,
}

fn default_ssl_strict() -> bool {
    true
}

fn default_submission_path() -> String {
    DEFAULT_SUBMISSION_PATH.to_string()
}

impl ClientConfig {
    /// Loads the configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::Io`] when the file cannot be read and
    /// [`CourierError::Serialization`] when it is not valid JSON. Field
    /// invariants are checked separately by [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(CourierError::Io)?;
        let config: ClientConfig =
            serde_json::from_str(&content).map_err(CourierError::Serialization)?;
        Ok(config)
    }

    /// Validates every invariant that must hold before network work starts.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::Config`] when:
    /// - `baseURL`, `clientId` or `aud` is missing or empty
    /// - neither a raw JWK nor a complete PKCS#12 reference (path and
    ///   passphrase) is configured
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(CourierError::Config("missing baseURL".to_string()).into());
        }
        if self.client_id.trim().is_empty() {
            return Err(CourierError::Config("missing clientId".to_string()).into());
        }
        if self.aud.trim().is_empty() {
            return Err(CourierError::Config("missing aud".to_string()).into());
        }
        if !self.has_key_source() {
            return Err(CourierError::Config(
                "no signing key configured: provide either a private jwk or pkcs12 + pkcs12Pass"
                    .to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Whether a signing-key source is configured (raw JWK, or a PKCS#12
    /// path together with its passphrase).
    pub fn has_key_source(&self) -> bool {
        self.jwk.is_some() || (self.pkcs12.is_some() && self.pkcs12_pass.is_some())
    }

    /// Per-request timeout as a [`std::time::Duration`].
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout.unwrap_or(DEFAULT_TIMEOUT_MS))
    }
}

//! SMART configuration discovery
//!
//! Before any credential work the client issues a single unauthenticated
//! request to `{baseURL}/.well-known/smart-configuration` and checks that
//! the authorization server advertises the scope it needs. The same
//! document supplies the token endpoint for the exchange step.
//!
//! A server without a well-known SMART configuration (or one whose
//! document lacks `scopes_supported`) is a discovery failure; a valid
//! document that simply does not list the scope is a normal `false`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CourierError, Result};

/// The OAuth scope required to submit messages.
pub const PROCESS_MESSAGE_SCOPE: &str = "system/$process-message";

/// Well-known path of the SMART discovery document.
pub const SMART_CONFIGURATION_PATH: &str = "/.well-known/smart-configuration";

/// A SMART-on-FHIR discovery document.
///
/// Only the fields this client acts on are modelled; everything else is
/// retained in `extra`.
///
/// # Examples
///
/// ```
/// use fhir_courier::auth::discovery::SmartConfiguration;
///
/// let json = r#"{
///     "token_endpoint": "https://auth.example.com/token",
///     "scopes_supported": ["system/$process-message"]
/// }"#;
///
/// let smart: SmartConfiguration = serde_json::from_str(json).unwrap();
/// assert_eq!(smart.token_endpoint.as_deref(), Some("https://auth.example.com/token"));
/// assert!(smart.supports_process_message().unwrap());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartConfiguration {
    /// URL of the authorization server's token endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,

    /// OAuth scopes the authorization server advertises.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,

    /// Additional discovery fields not explicitly modelled above.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl SmartConfiguration {
    /// Whether the server advertises [`PROCESS_MESSAGE_SCOPE`].
    ///
    /// An advertised list that lacks the scope is a normal `false`; a
    /// document without `scopes_supported` at all is a discovery failure.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::Discovery`] when `scopes_supported` is
    /// absent.
    pub fn supports_process_message(&self) -> Result<bool> {
        match &self.scopes_supported {
            Some(scopes) => Ok(scopes.iter().any(|s| s == PROCESS_MESSAGE_SCOPE)),
            None => Err(CourierError::Discovery(
                "server does not provide a well-known SMART configuration".to_string(),
            )
            .into()),
        }
    }
}

/// Fetches the SMART discovery document for a resource server.
///
/// Issues one unauthenticated `GET {base_url}/.well-known/smart-configuration`.
///
/// # Arguments
///
/// * `http` - Shared [`reqwest::Client`] used for the discovery request.
/// * `base_url` - Base URL of the FHIR resource server.
///
/// # Errors
///
/// Returns [`CourierError::Discovery`] when the request fails, the server
/// responds with a non-success status, or the body is not a JSON document.
pub async fn fetch_smart_configuration(
    http: &reqwest::Client,
    base_url: &str,
) -> Result<SmartConfiguration> {
    let url = format!(
        "{}{}",
        base_url.trim_end_matches('/'),
        SMART_CONFIGURATION_PATH
    );

    let resp = http.get(&url).send().await.map_err(|e| {
        CourierError::Discovery(format!("request for SMART configuration failed: {e}"))
    })?;

    if !resp.status().is_success() {
        return Err(CourierError::Discovery(
            "server does not provide a well-known SMART configuration".to_string(),
        )
        .into());
    }

    let smart: SmartConfiguration = resp.json().await.map_err(|e| {
        CourierError::Discovery(format!("failed to parse SMART configuration: {e}"))
    })?;

    Ok(smart)
}

//! Access token exchange at the authorization server's token endpoint
//!
//! The signed client assertion is posted as an
//! `application/x-www-form-urlencoded` body in the client-credentials
//! grant. The access token that comes back is an opaque bearer credential;
//! the client does not track its expiry and fetches it once per run.

use crate::auth::discovery::PROCESS_MESSAGE_SCOPE;
use crate::error::{CourierError, Result};

/// Fixed assertion type URN for the JWT-Bearer grant (RFC 7523).
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Exchanges a signed client assertion for an access token.
///
/// Posts the four-field form body (`client_assertion`,
/// `client_assertion_type`, `grant_type`, `scope`) to the token endpoint
/// and extracts `access_token` from the response. Some servers return the
/// token response as a JSON-encoded string instead of a JSON object; both
/// shapes are handled.
///
/// # Arguments
///
/// * `http` - HTTP client. TLS verification policy comes from the client
///   configuration that built it (strict by default).
/// * `token_endpoint` - Discovered or configured token endpoint URL.
/// * `assertion` - The compact JWS produced by
///   [`sign_assertion`](crate::auth::assertion::sign_assertion).
///
/// # Errors
///
/// Returns [`CourierError::Token`] when the HTTP call fails, the endpoint
/// responds with a non-success status, or the response carries no
/// `access_token`.
pub async fn exchange_token(
    http: &reqwest::Client,
    token_endpoint: &str,
    assertion: &str,
) -> Result<String> {
    let params = [
        ("client_assertion", assertion),
        ("client_assertion_type", CLIENT_ASSERTION_TYPE),
        ("grant_type", "client_credentials"),
        ("scope", PROCESS_MESSAGE_SCOPE),
    ];

    let resp = http
        .post(token_endpoint)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&params)
        .send()
        .await
        .map_err(|e| CourierError::Token(format!("token endpoint request failed: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(CourierError::Token(format!(
            "token endpoint returned {status}: {body}"
        ))
        .into());
    }

    let body = resp
        .text()
        .await
        .map_err(|e| CourierError::Token(format!("failed to read token response: {e}")))?;

    parse_access_token(&body)
}

/// Extracts `access_token` from a token endpoint response body.
///
/// The body is parsed as JSON; when the top-level value is itself a JSON
/// string, it is parsed a second time before the field lookup.
fn parse_access_token(body: &str) -> Result<String> {
    let mut value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| CourierError::Token(format!("token response is not JSON: {e}")))?;

    // Some gateways double-encode the token response.
    if let serde_json::Value::String(inner) = &value {
        value = serde_json::from_str(inner)
            .map_err(|e| CourierError::Token(format!("token response is not JSON: {e}")))?;
    }

    value
        .get("access_token")
        .and_then(|v| v.as_str())
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            CourierError::Token("the server could not provide an access token".to_string()).into()
        })
}

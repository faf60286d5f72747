//! JWT-Bearer client assertion signing (RFC 7523)
//!
//! The client proves its identity at the token endpoint with a signed,
//! short-lived JWT instead of a shared secret. Assertions are constructed
//! fresh for every authorization attempt, never persisted, and expire five
//! minutes after creation whether used or not.
//!
//! Signing performs no network I/O: apart from the wall clock and the
//! random `jti`, the output is a pure function of its inputs. Both are
//! injectable for deterministic tests.

use chrono::{DateTime, Utc};
use jsonwebtoken::Header;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::keys::SigningKey;
use crate::config::AssertionAlg;
use crate::error::{CourierError, Result};

/// Assertion lifetime: `exp` is issue time plus this many seconds.
pub const ASSERTION_LIFETIME_SECS: i64 = 300;

/// Claim set of a client assertion.
///
/// `iss` and `sub` are both the client id; `aud` is the token endpoint
/// unless the configuration overrides the audience; `jti` makes each
/// assertion single-use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Issuer: the client id.
    pub iss: String,

    /// Subject: the client id.
    pub sub: String,

    /// Audience: the token endpoint or a configured override.
    pub aud: String,

    /// Expiry as integer seconds since the epoch.
    pub exp: i64,

    /// Unique assertion identifier preventing replay.
    pub jti: String,
}

/// Builds the claim set for a client assertion.
///
/// Deterministic given `now` and `jti`; when `jti` is `None` a fresh
/// UUIDv4 is generated.
///
/// # Examples
///
/// ```
/// use chrono::TimeZone;
/// use fhir_courier::auth::assertion::{build_claims, ASSERTION_LIFETIME_SECS};
///
/// let now = chrono::Utc.timestamp_opt(1_700_000_000, 0).unwrap();
/// let claims = build_claims("abc", "https://auth.example.com/token", Some("jti-1"), now);
///
/// assert_eq!(claims.iss, "abc");
/// assert_eq!(claims.sub, "abc");
/// assert_eq!(claims.exp, 1_700_000_000 + ASSERTION_LIFETIME_SECS);
/// assert_eq!(claims.jti, "jti-1");
/// ```
pub fn build_claims(
    client_id: &str,
    audience: &str,
    jti: Option<&str>,
    now: DateTime<Utc>,
) -> AssertionClaims {
    AssertionClaims {
        iss: client_id.to_string(),
        sub: client_id.to_string(),
        aud: audience.to_string(),
        exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        jti: jti
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
    }
}

/// Signs a claim set into a compact three-part JWS.
///
/// The header carries the algorithm, `typ: JWT` and the signing key's
/// `kid` when one is known.
///
/// # Errors
///
/// Returns [`CourierError::Signing`] when the key is unusable for the
/// requested algorithm.
pub fn sign_claims(key: &SigningKey, alg: AssertionAlg, claims: &AssertionClaims) -> Result<String> {
    let mut header = Header::new(alg.to_jwt_algorithm());
    header.typ = Some("JWT".to_string());
    header.kid = key.kid.clone();

    jsonwebtoken::encode(&header, claims, key.encoding_key())
        .map_err(|e| CourierError::Signing(format!("failed to sign client assertion: {e}")).into())
}

/// Builds and signs a fresh client assertion.
///
/// # Arguments
///
/// * `key` - The resolved signing key.
/// * `alg` - Signature algorithm (RS384 default, RS256 for compatibility).
/// * `client_id` - Used for both `iss` and `sub`.
/// * `audience` - The token endpoint, or the configured audience override.
/// * `jti` - Caller-supplied assertion id; `None` generates a random one.
///
/// # Errors
///
/// Returns [`CourierError::Signing`] when signing fails.
pub fn sign_assertion(
    key: &SigningKey,
    alg: AssertionAlg,
    client_id: &str,
    audience: &str,
    jti: Option<&str>,
) -> Result<String> {
    let claims = build_claims(client_id, audience, jti, Utc::now());
    sign_claims(key, alg, &claims)
}

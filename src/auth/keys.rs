//! Signing key material resolution
//!
//! The client signs its assertions with an RSA private key that comes from
//! one of two sources:
//!
//! - a raw private JSON Web Key embedded in the configuration, or
//! - a PKCS#12 keystore on disk, decrypted with a passphrase.
//!
//! [`pkcs12_to_jwk`] handles the keystore path: it decodes the container,
//! decrypts it, extracts the private-key bag (certificate bags are ignored;
//! the certificate is not needed for signing) and converts the key into a
//! portable JWK. Any key identifier assigned during conversion is discarded
//! so that a caller-specified `kid` can be supplied at signing time.

use std::path::Path;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use jsonwebtoken::EncodingKey;
use p12_keystore::{KeyStore, KeyStoreEntry};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey};
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::{CourierError, Result};

// ---------------------------------------------------------------------------
// Jwk
// ---------------------------------------------------------------------------

/// An RSA JSON Web Key (RFC 7517 / RFC 7518 section 6.3).
///
/// Private keys carry `d`, `p` and `q` in addition to the public modulus
/// and exponent. The CRT coefficients (`dp`, `dq`, `qi`) are optional and
/// accepted but not produced by [`pkcs12_to_jwk`]; they are recomputed
/// from the primes when the key is loaded.
///
/// # Examples
///
/// ```
/// use fhir_courier::auth::keys::Jwk;
///
/// let json = r#"{"kty": "RSA", "kid": "key-1", "n": "AQAB", "e": "AQAB"}"#;
/// let jwk: Jwk = serde_json::from_str(json).unwrap();
/// assert_eq!(jwk.kty, "RSA");
/// assert_eq!(jwk.kid.as_deref(), Some("key-1"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type. Only `"RSA"` keys can sign RS256/RS384 assertions.
    pub kty: String,

    /// Key identifier, echoed in the signature header when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Intended algorithm hint (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Intended key use (informational).
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,

    /// Public modulus, base64url without padding.
    pub n: String,

    /// Public exponent, base64url without padding.
    pub e: String,

    /// Private exponent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,

    /// First prime factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,

    /// Second prime factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,

    /// First CRT exponent (optional, recomputed when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,

    /// Second CRT exponent (optional, recomputed when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,

    /// CRT coefficient (optional, recomputed when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
}

/// Encodes a big-endian unsigned integer as base64url without padding.
fn encode_uint(value: &BigUint) -> String {
    URL_SAFE_NO_PAD.encode(value.to_bytes_be())
}

/// Decodes a base64url field of a JWK into an unsigned integer.
fn decode_uint(field: &str, value: &str) -> Result<BigUint> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| CourierError::Signing(format!("invalid base64url in jwk field {field}: {e}")))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

/// Derives a private JWK from an RSA private key.
///
/// The resulting JWK carries `kty`, `n`, `e`, `d` and both primes. No
/// `kid` is assigned; callers that need one set it explicitly.
pub fn jwk_from_rsa(key: &RsaPrivateKey) -> Result<Jwk> {
    let primes = key.primes();
    if primes.len() < 2 {
        return Err(CourierError::Signing(
            "RSA key does not expose two prime factors".to_string(),
        )
        .into());
    }

    Ok(Jwk {
        kty: "RSA".to_string(),
        kid: None,
        alg: None,
        use_: Some("sig".to_string()),
        n: encode_uint(key.n()),
        e: encode_uint(key.e()),
        d: Some(encode_uint(key.d())),
        p: Some(encode_uint(&primes[0])),
        q: Some(encode_uint(&primes[1])),
        dp: None,
        dq: None,
        qi: None,
    })
}

/// Reconstructs an RSA private key from a private JWK.
///
/// # Errors
///
/// Returns [`CourierError::Signing`] when the key type is not RSA, when
/// `d`, `p` or `q` is missing, or when the components do not form a valid
/// key.
pub fn rsa_from_jwk(jwk: &Jwk) -> Result<RsaPrivateKey> {
    if jwk.kty != "RSA" {
        return Err(CourierError::Signing(format!(
            "unsupported key type {:?}: RS256/RS384 assertions require an RSA key",
            jwk.kty
        ))
        .into());
    }

    let n = decode_uint("n", &jwk.n)?;
    let e = decode_uint("e", &jwk.e)?;
    let d = match &jwk.d {
        Some(d) => decode_uint("d", d)?,
        None => {
            return Err(CourierError::Signing(
                "jwk is not a private key: missing d".to_string(),
            )
            .into())
        }
    };
    let (p, q) = match (&jwk.p, &jwk.q) {
        (Some(p), Some(q)) => (decode_uint("p", p)?, decode_uint("q", q)?),
        _ => {
            return Err(CourierError::Signing(
                "jwk is missing its prime factors (p, q)".to_string(),
            )
            .into())
        }
    };

    RsaPrivateKey::from_components(n, e, d, vec![p, q])
        .map_err(|e| CourierError::Signing(format!("invalid RSA key components: {e}")).into())
}

// ---------------------------------------------------------------------------
// PKCS#12 conversion
// ---------------------------------------------------------------------------

/// Extracts the private key from a PKCS#12 keystore and converts it to a
/// private JWK.
///
/// The container is decoded and decrypted with `passphrase`, the
/// private-key bag is located (certificate bags are skipped) and the
/// PKCS#8 key inside it is converted to a JWK. The converter never assigns
/// a `kid`; the assertion signer supplies one per signing operation.
///
/// # Errors
///
/// Returns [`CourierError::Decryption`] on a wrong passphrase, a corrupt
/// container, or a keystore without a private-key bag, and
/// [`CourierError::Signing`] when the extracted key is not a usable RSA
/// key.
pub fn pkcs12_to_jwk(path: &Path, passphrase: &str) -> Result<Jwk> {
    let bytes = std::fs::read(path).map_err(CourierError::Io)?;

    let keystore = KeyStore::from_pkcs12(&bytes, passphrase).map_err(|e| {
        CourierError::Decryption(format!(
            "could not decrypt PKCS#12 keystore {}: {e}",
            path.display()
        ))
    })?;

    // Only the private-key bag matters; the bundled certificate is not
    // needed for signing.
    let mut chain = None;
    for (_alias, entry) in keystore.entries() {
        if let KeyStoreEntry::PrivateKeyChain(found) = entry {
            chain = Some(found);
            break;
        }
    }
    let chain = chain.ok_or_else(|| {
        CourierError::Decryption(format!(
            "no private key bag found in keystore {}",
            path.display()
        ))
    })?;

    let key = RsaPrivateKey::from_pkcs8_der(chain.key())
        .map_err(|e| CourierError::Signing(format!("keystore key is not a usable RSA key: {e}")))?;

    let mut jwk = jwk_from_rsa(&key)?;
    // Drop any converter-assigned kid so the signer controls it.
    jwk.kid = None;
    Ok(jwk)
}

// ---------------------------------------------------------------------------
// SigningKey
// ---------------------------------------------------------------------------

/// A resolved signing key: the encoded RSA private key plus its `kid`.
///
/// Derived once per client lifetime and reused for every assertion.
pub struct SigningKey {
    encoding_key: EncodingKey,
    /// Key identifier placed in the signature header, when known.
    pub kid: Option<String>,
}

impl SigningKey {
    /// Builds a signing key from a private JWK.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::Signing`] when the JWK cannot be turned
    /// into a usable RSA private key.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        let key = rsa_from_jwk(jwk)?;
        let der = key
            .to_pkcs1_der()
            .map_err(|e| CourierError::Signing(format!("failed to encode RSA key: {e}")))?;

        Ok(Self {
            encoding_key: EncodingKey::from_rsa_der(der.as_bytes()),
            kid: jwk.kid.clone(),
        })
    }

    /// The `jsonwebtoken` encoding key for signing operations.
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

/// Resolves the signing key from the configured source.
///
/// A raw JWK takes priority; otherwise the PKCS#12 reference is used.
/// Callers memoize the result (see
/// [`MessageClient`](crate::client::MessageClient)) so the keystore is
/// parsed at most once per client lifetime.
///
/// # Errors
///
/// Returns [`CourierError::Config`] when neither source is configured,
/// plus the [`pkcs12_to_jwk`] / [`SigningKey::from_jwk`] failure modes.
pub fn resolve_signing_key(config: &ClientConfig) -> Result<SigningKey> {
    if let Some(ref jwk) = config.jwk {
        return SigningKey::from_jwk(jwk);
    }

    if let (Some(path), Some(pass)) = (&config.pkcs12, &config.pkcs12_pass) {
        let jwk = pkcs12_to_jwk(path, pass)?;
        return SigningKey::from_jwk(&jwk);
    }

    Err(CourierError::Config(
        "no signing key configured: provide either a private jwk or pkcs12 + pkcs12Pass"
            .to_string(),
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_key() -> RsaPrivateKey {
        let pem = include_str!("../../tests/fixtures/client_key.pem");
        RsaPrivateKey::from_pkcs8_pem(pem).unwrap()
    }

    // -----------------------------------------------------------------------
    // base64url integer encoding
    // -----------------------------------------------------------------------

    #[test]
    fn test_encode_decode_uint_round_trip() {
        let value = BigUint::from_bytes_be(&[0x01, 0x00, 0x01]);
        let encoded = encode_uint(&value);
        assert_eq!(encoded, "AQAB");
        let decoded = decode_uint("e", &encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_decode_uint_rejects_invalid_base64() {
        let err = decode_uint("n", "not base64!!").unwrap_err();
        let courier = err.downcast_ref::<CourierError>().unwrap();
        assert!(matches!(courier, CourierError::Signing(_)));
    }

    // -----------------------------------------------------------------------
    // JWK <-> RSA conversion
    // -----------------------------------------------------------------------

    #[test]
    fn test_jwk_from_rsa_round_trips_through_rsa_from_jwk() {
        let key = fixture_key();
        let jwk = jwk_from_rsa(&key).unwrap();

        assert_eq!(jwk.kty, "RSA");
        assert!(jwk.kid.is_none(), "conversion must not assign a kid");
        assert!(jwk.d.is_some());

        let restored = rsa_from_jwk(&jwk).unwrap();
        assert_eq!(restored.n(), key.n());
        assert_eq!(restored.d(), key.d());
    }

    #[test]
    fn test_rsa_from_jwk_rejects_non_rsa_kty() {
        let jwk = Jwk {
            kty: "EC".to_string(),
            kid: None,
            alg: None,
            use_: None,
            n: "AQAB".to_string(),
            e: "AQAB".to_string(),
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
        };
        let err = rsa_from_jwk(&jwk).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CourierError>(),
            Some(CourierError::Signing(_))
        ));
    }

    #[test]
    fn test_rsa_from_jwk_rejects_public_only_key() {
        let key = fixture_key();
        let mut jwk = jwk_from_rsa(&key).unwrap();
        jwk.d = None;
        let err = rsa_from_jwk(&jwk).unwrap_err();
        assert!(err.to_string().contains("missing d"));
    }

    #[test]
    fn test_rsa_from_jwk_requires_primes() {
        let key = fixture_key();
        let mut jwk = jwk_from_rsa(&key).unwrap();
        jwk.p = None;
        jwk.q = None;
        let err = rsa_from_jwk(&jwk).unwrap_err();
        assert!(err.to_string().contains("prime factors"));
    }

    #[test]
    fn test_jwk_serialization_skips_absent_fields() {
        let key = fixture_key();
        let jwk = jwk_from_rsa(&key).unwrap();
        let json = serde_json::to_value(&jwk).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("kid"));
        assert!(!obj.contains_key("dp"));
        assert!(obj.contains_key("n"));
        assert!(obj.contains_key("d"));
    }

    // -----------------------------------------------------------------------
    // SigningKey
    // -----------------------------------------------------------------------

    #[test]
    fn test_signing_key_from_private_jwk() {
        let key = fixture_key();
        let mut jwk = jwk_from_rsa(&key).unwrap();
        jwk.kid = Some("key-1".to_string());

        let signing_key = SigningKey::from_jwk(&jwk).unwrap();
        assert_eq!(signing_key.kid.as_deref(), Some("key-1"));
    }

    #[test]
    fn test_signing_key_debug_hides_key_material() {
        let key = fixture_key();
        let jwk = jwk_from_rsa(&key).unwrap();
        let signing_key = SigningKey::from_jwk(&jwk).unwrap();
        let debug = format!("{signing_key:?}");
        assert!(!debug.contains(&jwk.n));
        assert!(debug.contains("SigningKey"));
    }

    // -----------------------------------------------------------------------
    // resolve_signing_key
    // -----------------------------------------------------------------------

    #[test]
    fn test_resolve_signing_key_without_source_is_config_error() {
        let config: ClientConfig = serde_json::from_value(serde_json::json!({
            "baseURL": "https://fhir.example.com",
            "clientId": "abc",
            "aud": "https://auth.example.com/token"
        }))
        .unwrap();

        let err = resolve_signing_key(&config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CourierError>(),
            Some(CourierError::Config(_))
        ));
    }

    #[test]
    fn test_resolve_signing_key_prefers_raw_jwk() {
        let key = fixture_key();
        let jwk = jwk_from_rsa(&key).unwrap();

        let config: ClientConfig = serde_json::from_value(serde_json::json!({
            "baseURL": "https://fhir.example.com",
            "clientId": "abc",
            "aud": "https://auth.example.com/token",
            "jwk": serde_json::to_value(&jwk).unwrap(),
            "pkcs12": "/nonexistent/keystore.p12",
            "pkcs12Pass": "wrong"
        }))
        .unwrap();

        // The raw JWK wins; the bogus keystore path is never touched.
        assert!(resolve_signing_key(&config).is_ok());
    }
}

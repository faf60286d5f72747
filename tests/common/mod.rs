//! Shared helpers for fhir-courier integration tests
#![allow(dead_code)]

use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;

use fhir_courier::auth::keys::{jwk_from_rsa, Jwk};
use fhir_courier::config::ClientConfig;

/// Private RSA key fixture matching `tests/fixtures/client_pub.pem` and the
/// key inside `tests/fixtures/client.p12`.
pub fn fixture_rsa_key() -> RsaPrivateKey {
    let pem = include_str!("../fixtures/client_key.pem");
    RsaPrivateKey::from_pkcs8_pem(pem).unwrap()
}

/// The fixture key as a private JWK.
pub fn fixture_jwk() -> Jwk {
    jwk_from_rsa(&fixture_rsa_key()).unwrap()
}

/// A complete, valid client configuration pointing at `base_url`, signing
/// with the fixture JWK.
pub fn client_config(base_url: &str) -> ClientConfig {
    serde_json::from_value(serde_json::json!({
        "baseURL": base_url,
        "clientId": "test-client",
        "aud": format!("{base_url}/token"),
        "timeout": 5000,
        "jwk": serde_json::to_value(fixture_jwk()).unwrap()
    }))
    .unwrap()
}

/// A SMART discovery document advertising `scopes` with the token endpoint
/// at `{base_url}/token`.
pub fn smart_configuration_body(base_url: &str, scopes: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "token_endpoint": format!("{base_url}/token"),
        "scopes_supported": scopes,
        "capabilities": ["client-confidential-asymmetric"]
    })
}

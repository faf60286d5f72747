//! Authentication against a SMART-on-FHIR authorization server
//!
//! The four authorization steps form a strict dependency chain:
//!
//! 1. [`discovery`] — fetch the well-known SMART configuration and check
//!    the advertised scopes.
//! 2. [`keys`] — resolve the RSA signing key from a raw JWK or a PKCS#12
//!    keystore.
//! 3. [`assertion`] — build and sign the JWT-Bearer client assertion.
//! 4. [`token`] — exchange the assertion for an access token.
//!
//! [`crate::client::MessageClient`] drives the chain and hands out an
//! authorized session.

pub mod assertion;
pub mod discovery;
pub mod keys;
pub mod token;

pub use assertion::{sign_assertion, AssertionClaims, ASSERTION_LIFETIME_SECS};
pub use discovery::{fetch_smart_configuration, SmartConfiguration, PROCESS_MESSAGE_SCOPE};
pub use keys::{pkcs12_to_jwk, resolve_signing_key, Jwk, SigningKey};
pub use token::{exchange_token, CLIENT_ASSERTION_TYPE};

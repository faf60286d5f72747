//! Command handlers for the fhir-courier CLI
//!
//! One module per subcommand: [`send`] drives the probe → authorize →
//! batch pipeline, [`convert`] extracts a JWK from a PKCS#12 keystore.

pub mod convert;
pub mod send;

//! # JSON Object Signing (JOSE) for Federation Statements
//!
//! Entity statements are JWTs in compact JWS form ([RFC7515]). This crate
//! builds them from a [`credibil_keys::Signer`] and parses and verifies them
//! against a JWK ([RFC7517]).
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517

pub mod jws;

pub use self::jws::{Jws, JwsBuilder, Protected, Signature};

//! # Test Utilities
//!
//! Helpers shared by the federation integration tests: one-time tracing
//! set-up and builders for hand-crafted (often deliberately broken) entity
//! statements.

use std::sync::Once;

use base64ct::{Base64UrlUnpadded, Encoding};
use credibil_keys::Signer;
use serde_json::Value;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// # Panics
///
/// Panics if the tracing subscriber cannot be set.
pub fn init_tracer() {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::ERROR).finish();
        tracing::subscriber::set_global_default(subscriber).expect("subscriber set");
    });
}

/// Base64url encode a JSON value as a JWS segment.
#[must_use]
pub fn encode_segment(value: &Value) -> String {
    Base64UrlUnpadded::encode_string(value.to_string().as_bytes())
}

/// Sign an arbitrary header and payload, returning the compact JWS.
///
/// # Panics
///
/// Panics if signing fails.
pub fn sign_compact(signer: &impl Signer, header: &Value, payload: &Value) -> String {
    let protected = encode_segment(header);
    let payload = encode_segment(payload);
    let sig = signer.try_sign(format!("{protected}.{payload}").as_bytes()).expect("should sign");
    format!("{protected}.{payload}.{}", Base64UrlUnpadded::encode_string(&sig))
}

/// Modify the payload of a compact JWS, keeping its original header and
/// signature.
///
/// # Panics
///
/// Panics if `compact` is not a compact JWS with a JSON payload.
pub fn tamper_payload(compact: &str, tamper: impl FnOnce(&mut Value)) -> String {
    let [protected, payload, signature] = segments(compact);
    let decoded = Base64UrlUnpadded::decode_vec(payload).expect("should decode payload");
    let mut claims: Value = serde_json::from_slice(&decoded).expect("should parse payload");
    tamper(&mut claims);
    format!("{protected}.{}.{signature}", encode_segment(&claims))
}

/// Combine compact JWSs over the same payload into a general JWS JSON
/// serialization carrying one signature per input.
///
/// # Panics
///
/// Panics if an input is not a compact JWS or the payloads differ.
#[must_use]
pub fn general_json(compacts: &[&str]) -> String {
    let mut payload = None;
    let mut signatures = Vec::new();

    for compact in compacts {
        let [protected, this_payload, signature] = segments(compact);
        assert!(payload.is_none_or(|p| p == this_payload), "payloads should match");
        payload = Some(this_payload);
        signatures.push(serde_json::json!({"protected": protected, "signature": signature}));
    }

    serde_json::json!({"payload": payload, "signatures": signatures}).to_string()
}

/// The decoded protected header of a compact JWS.
///
/// # Panics
///
/// Panics if `compact` is not a compact JWS with a JSON header.
#[must_use]
pub fn header(compact: &str) -> Value {
    let [protected, _, _] = segments(compact);
    let decoded = Base64UrlUnpadded::decode_vec(protected).expect("should decode header");
    serde_json::from_slice(&decoded).expect("should parse header")
}

fn segments(compact: &str) -> [&str; 3] {
    let parts = compact.split('.').collect::<Vec<_>>();
    parts.try_into().expect("compact JWS should have three segments")
}

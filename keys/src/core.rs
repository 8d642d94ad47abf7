//! # Primitive Key Types

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Prefix byte (tag) to indicate an uncompressed SEC1 public key.
pub const TAG_PUBKEY_FULL: u8 = 0x04;

/// Modulus size, in bits, of generated RSA keys.
pub const RSA_MODULUS_BITS: usize = 2048;

/// Cryptographic key type (JWK `kty`).
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
pub enum KeyType {
    /// RSA key pair
    #[serde(rename = "RSA")]
    Rsa,

    /// Elliptic curve key pair
    #[serde(rename = "EC")]
    Ec,
}

impl Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa => write!(f, "RSA"),
            Self::Ec => write!(f, "EC"),
        }
    }
}

/// Elliptic curves supported for signing keys (JWK `crv`).
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
pub enum Curve {
    /// NIST P-256 (secp256r1).
    #[serde(rename = "P-256")]
    P256,

    /// NIST P-384 (secp384r1).
    #[serde(rename = "P-384")]
    P384,
}

impl Display for Curve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::P256 => write!(f, "P-256"),
            Self::P384 => write!(f, "P-384"),
        }
    }
}

/// JWS signature algorithms accepted when parsing a signed statement.
///
/// Only RSA PKCS#1 v1.5 and ECDSA families are listed. Anything else,
/// including `none` and the HMAC algorithms, fails to deserialize.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,

    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,

    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,

    /// ECDSA using P-256 and SHA-256
    ES256,

    /// ECDSA using P-384 and SHA-384
    ES384,

    /// ECDSA using P-521 and SHA-512
    ES512,
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The kinds of key that can be generated.
///
/// Each kind maps to exactly one signing algorithm, so a generated key can
/// never end up without an `alg`.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum KeySpec {
    /// 2048-bit RSA, signs with `RS256`.
    Rsa2048,

    /// P-256, signs with `ES256`.
    P256,

    /// P-384, signs with `ES384`.
    P384,
}

impl KeySpec {
    /// The signing algorithm used by keys of this kind.
    #[must_use]
    pub const fn algorithm(self) -> Algorithm {
        match self {
            Self::Rsa2048 => Algorithm::RS256,
            Self::P256 => Algorithm::ES256,
            Self::P384 => Algorithm::ES384,
        }
    }

    /// The JWK key type of keys of this kind.
    #[must_use]
    pub const fn key_type(self) -> KeyType {
        match self {
            Self::Rsa2048 => KeyType::Rsa,
            Self::P256 | Self::P384 => KeyType::Ec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_spec_algorithms() {
        assert_eq!(KeySpec::Rsa2048.algorithm(), Algorithm::RS256);
        assert_eq!(KeySpec::P256.algorithm(), Algorithm::ES256);
        assert_eq!(KeySpec::P384.algorithm(), Algorithm::ES384);
        assert_eq!(KeySpec::P384.key_type(), KeyType::Ec);
    }

    #[test]
    fn algorithm_allow_list() {
        let alg: Algorithm = serde_json::from_str(r#""ES384""#).expect("should deserialize");
        assert_eq!(alg, Algorithm::ES384);

        assert!(serde_json::from_str::<Algorithm>(r#""none""#).is_err());
        assert!(serde_json::from_str::<Algorithm>(r#""HS256""#).is_err());
        assert!(serde_json::from_str::<Algorithm>(r#""PS256""#).is_err());
    }

    #[test]
    fn curve_names() {
        assert_eq!(serde_json::to_string(&Curve::P256).expect("should serialize"), r#""P-256""#);
        assert_eq!(Curve::P384.to_string(), "P-384");
    }
}

//! # JSON Web Key (JWK)
//!
//! Public key material in JWK form ([RFC7517]) together with the JWK
//! Thumbprint ([RFC7638]) used as each key's `kid`.
//!
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517
//! [RFC7638]: https://www.rfc-editor.org/rfc/rfc7638

use anyhow::{Result, anyhow, bail};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::core::{Algorithm, Curve, KeyType, TAG_PUBKEY_FULL};

/// The public half of a key pair, as published in a JWK Set.
///
/// No type in this crate serializes private key material: a `PublicKeyJwk`
/// is the only serializable view of a key.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PublicKeyJwk {
    /// Key type.
    pub kty: KeyType,

    /// Curve, for EC keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<Curve>,

    /// RSA modulus, base64url encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent, base64url encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// EC x coordinate, base64url encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC y coordinate, base64url encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// Key identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Algorithm the key is intended to be used with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<Algorithm>,

    /// Intended use of the key (`sig` for every key generated here).
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
}

impl PublicKeyJwk {
    /// Build an RSA JWK from big-endian modulus and exponent bytes.
    #[must_use]
    pub fn rsa(n: &[u8], e: &[u8]) -> Self {
        Self {
            kty: KeyType::Rsa,
            crv: None,
            n: Some(Base64UrlUnpadded::encode_string(n)),
            e: Some(Base64UrlUnpadded::encode_string(e)),
            x: None,
            y: None,
            kid: None,
            alg: None,
            use_: None,
        }
    }

    /// Build an EC JWK from an uncompressed SEC1 encoded point.
    ///
    /// # Errors
    ///
    /// Returns an error if the point is not in uncompressed form.
    pub fn ec(crv: Curve, sec1: &[u8]) -> Result<Self> {
        let Some((&TAG_PUBKEY_FULL, coords)) = sec1.split_first() else {
            bail!("public key is not an uncompressed SEC1 point");
        };
        let (x, y) = coords.split_at(coords.len() / 2);

        Ok(Self {
            kty: KeyType::Ec,
            crv: Some(crv),
            n: None,
            e: None,
            x: Some(Base64UrlUnpadded::encode_string(x)),
            y: Some(Base64UrlUnpadded::encode_string(y)),
            kid: None,
            alg: None,
            use_: None,
        })
    }

    /// Compute the JWK Thumbprint of the key.
    ///
    /// The thumbprint is the base64url encoded SHA-256 hash of the key's
    /// required members, serialized with lexicographically ordered names and
    /// no whitespace. Optional members (`kid`, `alg`, `use`) do not affect it.
    ///
    /// # Errors
    ///
    /// Returns an error if a required member for the key type is missing.
    pub fn thumbprint(&self) -> Result<String> {
        let canonical = match self.kty {
            KeyType::Rsa => {
                let (Some(e), Some(n)) = (&self.e, &self.n) else {
                    bail!("RSA key is missing 'n' or 'e'");
                };
                format!(r#"{{"e":"{e}","kty":"RSA","n":"{n}"}}"#)
            }
            KeyType::Ec => {
                let (Some(crv), Some(x), Some(y)) = (&self.crv, &self.x, &self.y) else {
                    bail!("EC key is missing 'crv', 'x' or 'y'");
                };
                format!(r#"{{"crv":"{crv}","kty":"EC","x":"{x}","y":"{y}"}}"#)
            }
        };

        let digest = Sha256::digest(canonical.as_bytes());
        Ok(Base64UrlUnpadded::encode_string(&digest))
    }

    /// The key's `kid`, or `None` when absent or empty.
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        self.kid.as_deref().filter(|kid| !kid.is_empty())
    }

    /// Uncompressed SEC1 encoding of an EC public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not an EC key on `crv` or a coordinate
    /// cannot be decoded.
    pub fn to_sec1(&self, crv: Curve) -> Result<Vec<u8>> {
        if self.kty != KeyType::Ec || self.crv != Some(crv) {
            bail!("key is not an EC key on curve {crv}");
        }
        let x = self.x.as_ref().ok_or_else(|| anyhow!("EC key 'x' is missing"))?;
        let y = self.y.as_ref().ok_or_else(|| anyhow!("EC key 'y' is missing"))?;

        let mut sec1 = vec![TAG_PUBKEY_FULL];
        sec1.append(&mut Base64UrlUnpadded::decode_vec(x)?);
        sec1.append(&mut Base64UrlUnpadded::decode_vec(y)?);
        Ok(sec1)
    }

    /// Build an RSA public key from the JWK's modulus and exponent.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not an RSA key or its parameters are
    /// invalid.
    pub fn to_rsa_public_key(&self) -> Result<rsa::RsaPublicKey> {
        if self.kty != KeyType::Rsa {
            bail!("key is not an RSA key");
        }
        let n = self.n.as_ref().ok_or_else(|| anyhow!("RSA key 'n' is missing"))?;
        let e = self.e.as_ref().ok_or_else(|| anyhow!("RSA key 'e' is missing"))?;

        let n = rsa::BigUint::from_bytes_be(&Base64UrlUnpadded::decode_vec(n)?);
        let e = rsa::BigUint::from_bytes_be(&Base64UrlUnpadded::decode_vec(e)?);
        rsa::RsaPublicKey::new(n, e).map_err(|e| anyhow!("invalid RSA public key: {e}"))
    }
}

/// A JSON Web Key Set: `{"keys": [...]}`.
///
/// Keys this crate can verify with are parsed into [`PublicKeyJwk`]s. Any
/// other key published in the set (an unsupported `kty`, `crv` or `alg`) is
/// kept as received so that it neither fails the whole set nor gets lost when
/// the set is serialized again, after the supported keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Jwks {
    /// The supported keys in the set, in publication order.
    pub keys: Vec<PublicKeyJwk>,

    unsupported: Vec<Value>,
}

impl Jwks {
    /// Every supported key in the set whose `kid` equals `kid`.
    ///
    /// All matches are returned so callers can reject an ambiguous set.
    #[must_use]
    pub fn find(&self, kid: &str) -> Vec<&PublicKeyJwk> {
        self.keys.iter().filter(|jwk| jwk.key_id() == Some(kid)).collect()
    }

    /// The `kid` of every supported key in the set.
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().filter_map(PublicKeyJwk::key_id)
    }

    /// Keys in the set that could not be parsed as a supported key.
    #[must_use]
    pub fn unsupported(&self) -> &[Value] {
        &self.unsupported
    }

    /// Returns `true` if the set holds no keys.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.unsupported.is_empty()
    }
}

impl From<Vec<PublicKeyJwk>> for Jwks {
    fn from(keys: Vec<PublicKeyJwk>) -> Self {
        Self {
            keys,
            unsupported: Vec::new(),
        }
    }
}

impl Serialize for Jwks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(untagged)]
        enum Entry<'a> {
            Supported(&'a PublicKeyJwk),
            Unsupported(&'a Value),
        }

        #[derive(Serialize)]
        struct Wire<'a> {
            keys: Vec<Entry<'a>>,
        }

        let keys = self
            .keys
            .iter()
            .map(Entry::Supported)
            .chain(self.unsupported.iter().map(Entry::Unsupported))
            .collect();
        Wire { keys }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Jwks {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Entry {
            Supported(PublicKeyJwk),
            Unsupported(Value),
        }

        #[derive(Deserialize)]
        struct Wire {
            keys: Vec<Entry>,
        }

        let mut jwks = Self::default();
        for entry in Wire::deserialize(deserializer)?.keys {
            match entry {
                Entry::Supported(jwk) => jwks.keys.push(jwk),
                Entry::Unsupported(value) => {
                    tracing::debug!(kid = ?value.get("kid"), "keeping unsupported key");
                    jwks.unsupported.push(value);
                }
            }
        }
        Ok(jwks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ec_jwk(kid: &str) -> PublicKeyJwk {
        let mut sec1 = vec![TAG_PUBKEY_FULL];
        sec1.extend_from_slice(&[1; 32]);
        sec1.extend_from_slice(&[2; 32]);
        PublicKeyJwk {
            kid: Some(kid.to_string()),
            ..PublicKeyJwk::ec(Curve::P256, &sec1).expect("should build")
        }
    }

    #[test]
    fn thumbprint_ignores_optional_members() {
        let jwk = ec_jwk("one");
        let other = PublicKeyJwk {
            kid: None,
            alg: Some(Algorithm::ES256),
            use_: Some("sig".to_string()),
            ..jwk.clone()
        };

        let thumbprint = jwk.thumbprint().expect("should compute");
        assert_eq!(thumbprint, other.thumbprint().expect("should compute"));

        // SHA-256, base64url without padding
        assert_eq!(thumbprint.len(), 43);
        assert!(!thumbprint.contains('='));
    }

    #[test]
    fn thumbprint_canonical_form() {
        let jwk = PublicKeyJwk::rsa(&[0xd2, 0xfc], &[1, 0, 1]);
        let expected = Sha256::digest(br#"{"e":"AQAB","kty":"RSA","n":"0vw"}"#);
        assert_eq!(
            jwk.thumbprint().expect("should compute"),
            Base64UrlUnpadded::encode_string(&expected)
        );
    }

    #[test]
    fn thumbprint_requires_members() {
        let mut jwk = ec_jwk("one");
        jwk.y = None;
        assert!(jwk.thumbprint().is_err());
    }

    #[test]
    fn ec_rejects_compressed_point() {
        let mut sec1 = vec![0x02];
        sec1.extend_from_slice(&[1; 32]);
        assert!(PublicKeyJwk::ec(Curve::P256, &sec1).is_err());
    }

    #[test]
    fn find_returns_every_match() {
        let jwks = Jwks::from(vec![ec_jwk("one"), ec_jwk("two"), ec_jwk("one")]);
        assert_eq!(jwks.find("one").len(), 2);
        assert_eq!(jwks.find("two").len(), 1);
        assert!(jwks.find("three").is_empty());
        assert_eq!(jwks.key_ids().collect::<Vec<_>>(), vec!["one", "two", "one"]);
    }

    #[test]
    fn empty_kid_never_matches() {
        let jwks = Jwks::from(vec![ec_jwk("")]);
        assert!(jwks.find("").is_empty());
    }

    #[test]
    fn serialized_members() {
        let jwk = PublicKeyJwk {
            kid: Some("abc".to_string()),
            alg: Some(Algorithm::RS256),
            use_: Some("sig".to_string()),
            ..PublicKeyJwk::rsa(&[1, 2, 3], &[1, 0, 1])
        };
        let value = serde_json::to_value(&jwk).expect("should serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "kty": "RSA", "n": "AQID", "e": "AQAB", "kid": "abc", "alg": "RS256", "use": "sig"
            })
        );
    }

    #[test]
    fn keeps_unsupported_keys() {
        let json = serde_json::json!({"keys": [
            {"kty": "RSA", "n": "AQID", "e": "AQAB", "kid": "ps", "alg": "PS256"},
            {"kty": "OKP", "crv": "Ed25519", "x": "AQID", "kid": "ed"},
            ec_jwk("one"),
            {"kty": "EC", "crv": "P-521", "x": "AQID", "y": "AQID", "kid": "p521"},
        ]});

        let jwks: Jwks = serde_json::from_value(json).expect("should deserialize");
        assert_eq!(jwks.keys, vec![ec_jwk("one")]);
        assert_eq!(jwks.unsupported().len(), 3);
        assert!(jwks.find("ps").is_empty());

        // unsupported keys are published again, after the supported ones
        let value = serde_json::to_value(&jwks).expect("should serialize");
        let kids = value["keys"]
            .as_array()
            .expect("keys array")
            .iter()
            .map(|key| key["kid"].as_str().expect("kid"))
            .collect::<Vec<_>>();
        assert_eq!(kids, vec!["one", "ps", "ed", "p521"]);
    }
}

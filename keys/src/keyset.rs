//! Key generation and key sets

use std::fmt;

use anyhow::{Result, anyhow};
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use sha2::Sha256;

use crate::core::{Algorithm, Curve, KeySpec, RSA_MODULUS_BITS};
use crate::jwk::{Jwks, PublicKeyJwk};

/// Private key material, one variant per supported key kind.
pub(crate) enum SecretKey {
    Rsa(Box<rsa::pkcs1v15::SigningKey<Sha256>>),
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
}

/// An owned key pair with its derived `kid` and signing algorithm.
///
/// The `kid` and algorithm are fixed when the key is generated. The private
/// half never leaves the key: the only serializable view is
/// [`Key::public_jwk`].
pub struct Key {
    jwk: PublicKeyJwk,
    kid: String,
    algorithm: Algorithm,
    pub(crate) secret: SecretKey,
}

impl Key {
    /// Generate a new key of the requested kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the random key generation fails.
    pub fn generate(spec: KeySpec) -> Result<Self> {
        let (jwk, secret) = match spec {
            KeySpec::Rsa2048 => {
                let private_key = rsa::RsaPrivateKey::new(&mut OsRng, RSA_MODULUS_BITS)
                    .map_err(|e| anyhow!("issue generating RSA key: {e}"))?;
                let jwk = PublicKeyJwk::rsa(
                    &private_key.n().to_bytes_be(),
                    &private_key.e().to_bytes_be(),
                );
                let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new(private_key);
                (jwk, SecretKey::Rsa(Box::new(signing_key)))
            }
            KeySpec::P256 => {
                let signing_key = p256::ecdsa::SigningKey::random(&mut OsRng);
                let point = signing_key.verifying_key().to_encoded_point(false);
                let jwk = PublicKeyJwk::ec(Curve::P256, point.as_bytes())?;
                (jwk, SecretKey::P256(signing_key))
            }
            KeySpec::P384 => {
                let signing_key = p384::ecdsa::SigningKey::random(&mut OsRng);
                let point = signing_key.verifying_key().to_encoded_point(false);
                let jwk = PublicKeyJwk::ec(Curve::P384, point.as_bytes())?;
                (jwk, SecretKey::P384(signing_key))
            }
        };

        let kid = jwk.thumbprint()?;
        let algorithm = spec.algorithm();
        let jwk = PublicKeyJwk {
            kid: Some(kid.clone()),
            alg: Some(algorithm),
            use_: Some("sig".to_string()),
            ..jwk
        };

        tracing::debug!(%kid, %algorithm, "generated key");
        Ok(Self {
            jwk,
            kid,
            algorithm,
            secret,
        })
    }

    /// The key's identifier (its JWK thumbprint).
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// The algorithm this key signs with.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The public projection of the key, carrying `kid`, `alg` and `use`.
    #[must_use]
    pub const fn public_jwk(&self) -> &PublicKeyJwk {
        &self.jwk
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// An ordered set of keys owned by a single entity.
///
/// Keys are only added while the set is generated; afterwards the set is
/// read-only.
#[derive(Debug, Default)]
pub struct KeySet {
    keys: Vec<Key>,
}

impl KeySet {
    /// Generate one key per spec, preserving the order of `specs`.
    ///
    /// # Errors
    ///
    /// Returns an error if generating any key fails. No partial set is
    /// returned.
    pub fn generate(specs: &[KeySpec]) -> Result<Self> {
        let keys = specs.iter().map(|spec| Key::generate(*spec)).collect::<Result<Vec<_>>>()?;
        Ok(Self { keys })
    }

    /// The public view of the set.
    ///
    /// The returned [`Jwks`] is a fresh value holding only public parameters;
    /// it shares nothing with this set.
    #[must_use]
    pub fn public(&self) -> Jwks {
        Jwks::from(self.keys.iter().map(|key| key.public_jwk().clone()).collect::<Vec<_>>())
    }

    /// The first key in the set.
    #[must_use]
    pub fn first(&self) -> Option<&Key> {
        self.keys.first()
    }

    /// The key with the given `kid`.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Key> {
        self.keys.iter().find(|key| key.kid() == kid)
    }

    /// Iterate over the keys in generation order.
    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter()
    }

    /// Number of keys in the set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the set holds no keys.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::KeyType;

    #[test]
    fn generate_preserves_order() {
        let specs = [KeySpec::Rsa2048, KeySpec::P256, KeySpec::P384];
        let key_set = KeySet::generate(&specs).expect("should generate");

        assert_eq!(key_set.len(), 3);
        let algorithms = key_set.iter().map(Key::algorithm).collect::<Vec<_>>();
        assert_eq!(algorithms, vec![Algorithm::RS256, Algorithm::ES256, Algorithm::ES384]);
    }

    #[test]
    fn kid_is_thumbprint_of_public_key() {
        let key_set = KeySet::generate(&[KeySpec::Rsa2048, KeySpec::P256]).expect("should generate");

        for key in key_set.iter() {
            let jwk = key.public_jwk();
            assert_eq!(jwk.kid.as_deref(), Some(key.kid()));
            assert_eq!(jwk.thumbprint().expect("should compute"), key.kid());
            assert_eq!(jwk.alg, Some(key.algorithm()));
            assert_eq!(jwk.use_.as_deref(), Some("sig"));
        }
    }

    #[test]
    fn distinct_keys_distinct_kids() {
        let key_set = KeySet::generate(&[KeySpec::P256, KeySpec::P256]).expect("should generate");
        let kids = key_set.iter().map(Key::kid).collect::<Vec<_>>();
        assert_ne!(kids[0], kids[1]);
    }

    #[test]
    fn public_view_is_public_only() {
        let key_set = KeySet::generate(&[KeySpec::Rsa2048, KeySpec::P384]).expect("should generate");
        let jwks = key_set.public();

        assert_eq!(jwks.keys.len(), 2);
        assert_eq!(jwks.keys[0].kty, KeyType::Rsa);
        assert_eq!(jwks.keys[1].crv, Some(Curve::P384));
        assert_eq!(jwks.key_ids().collect::<Vec<_>>(), key_set.iter().map(Key::kid).collect::<Vec<_>>());

        // private parameters never appear in the serialized view
        let json = serde_json::to_value(&jwks).expect("should serialize");
        for key in json["keys"].as_array().expect("keys array") {
            for private in ["d", "p", "q", "dp", "dq", "qi"] {
                assert!(key.get(private).is_none(), "{private} should not be published");
            }
        }
    }

    #[test]
    fn find_by_kid() {
        let key_set = KeySet::generate(&[KeySpec::P256, KeySpec::P384]).expect("should generate");
        let second = key_set.iter().nth(1).expect("two keys");

        let found = key_set.find(second.kid()).expect("should find");
        assert_eq!(found.algorithm(), Algorithm::ES384);
        assert!(key_set.find("unknown").is_none());
    }

    #[test]
    fn empty_set() {
        let key_set = KeySet::generate(&[]).expect("should generate");
        assert!(key_set.is_empty());
        assert!(key_set.first().is_none());
        assert!(key_set.public().is_empty());
    }

    #[test]
    fn debug_hides_secret() {
        let key = Key::generate(KeySpec::P256).expect("should generate");
        let debug = format!("{key:?}");
        assert!(debug.contains(key.kid()));
        assert!(debug.ends_with(".. }"));
    }
}

//! # Signing

use anyhow::{Result, anyhow, bail};
use ecdsa::signature::{Signer as _, Verifier as _};
use rsa::signature::{SignatureEncoding as _, Signer as _, Verifier};
use sha2::{Sha256, Sha384, Sha512};

use crate::core::{Algorithm, Curve};
use crate::jwk::PublicKeyJwk;
use crate::keyset::{Key, SecretKey};

/// Signer provides the signing function used to produce JWS signatures.
pub trait Signer: Send + Sync {
    /// Sign the message, returning the raw JWS signature bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying signing operation fails.
    fn try_sign(&self, msg: &[u8]) -> Result<Vec<u8>>;

    /// Signature algorithm used by the signer.
    fn algorithm(&self) -> Algorithm;

    /// The identifier of the key a verifier should use.
    fn key_id(&self) -> &str;
}

impl Signer for Key {
    fn try_sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        match &self.secret {
            SecretKey::Rsa(signing_key) => {
                let signature = signing_key
                    .try_sign(msg)
                    .map_err(|e| anyhow!("issue signing with RSA key: {e}"))?;
                Ok(signature.to_vec())
            }
            SecretKey::P256(signing_key) => {
                let signature: p256::ecdsa::Signature = signing_key
                    .try_sign(msg)
                    .map_err(|e| anyhow!("issue signing with P-256 key: {e}"))?;
                Ok(signature.to_bytes().to_vec())
            }
            SecretKey::P384(signing_key) => {
                let signature: p384::ecdsa::Signature = signing_key
                    .try_sign(msg)
                    .map_err(|e| anyhow!("issue signing with P-384 key: {e}"))?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }

    fn algorithm(&self) -> Algorithm {
        Self::algorithm(self)
    }

    fn key_id(&self) -> &str {
        self.kid()
    }
}

/// Verifications
impl Algorithm {
    /// Verify a JWS signature over `msg` using the public key in `jwk`.
    ///
    /// ECDSA signatures are expected in the fixed-width `r || s` form JWS
    /// uses.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature is invalid, the key does not suit the
    /// algorithm, or the algorithm cannot be verified here.
    pub fn verify(&self, msg: &[u8], sig: &[u8], jwk: &PublicKeyJwk) -> Result<()> {
        match self {
            Self::RS256 => {
                let verifying_key =
                    rsa::pkcs1v15::VerifyingKey::<Sha256>::new(jwk.to_rsa_public_key()?);
                verify_pkcs1v15(&verifying_key, msg, sig)
            }
            Self::RS384 => {
                let verifying_key =
                    rsa::pkcs1v15::VerifyingKey::<Sha384>::new(jwk.to_rsa_public_key()?);
                verify_pkcs1v15(&verifying_key, msg, sig)
            }
            Self::RS512 => {
                let verifying_key =
                    rsa::pkcs1v15::VerifyingKey::<Sha512>::new(jwk.to_rsa_public_key()?);
                verify_pkcs1v15(&verifying_key, msg, sig)
            }
            Self::ES256 => {
                let verifying_key =
                    p256::ecdsa::VerifyingKey::from_sec1_bytes(&jwk.to_sec1(Curve::P256)?)?;
                let signature = p256::ecdsa::Signature::from_slice(sig)?;
                Ok(verifying_key.verify(msg, &signature)?)
            }
            Self::ES384 => {
                let verifying_key =
                    p384::ecdsa::VerifyingKey::from_sec1_bytes(&jwk.to_sec1(Curve::P384)?)?;
                let signature = p384::ecdsa::Signature::from_slice(sig)?;
                Ok(verifying_key.verify(msg, &signature)?)
            }
            Self::ES512 => bail!("no P-521 key support for ES512 verification"),
        }
    }
}

fn verify_pkcs1v15(
    verifying_key: &impl Verifier<rsa::pkcs1v15::Signature>, msg: &[u8], sig: &[u8],
) -> Result<()> {
    let signature = rsa::pkcs1v15::Signature::try_from(sig)
        .map_err(|e| anyhow!("invalid RSA signature encoding: {e}"))?;
    verifying_key.verify(msg, &signature).map_err(|e| anyhow!("unable to verify signature: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::KeySpec;

    const MSG: &[u8] = b"The true sign of intelligence is not knowledge but imagination.";

    #[test]
    fn sign_and_verify_each_kind() {
        for spec in [KeySpec::Rsa2048, KeySpec::P256, KeySpec::P384] {
            let key = Key::generate(spec).expect("should generate");
            let sig = key.try_sign(MSG).expect("should sign");

            Signer::algorithm(&key)
                .verify(MSG, &sig, key.public_jwk())
                .expect("signature should verify");
        }
    }

    #[test]
    fn ecdsa_signature_is_fixed_width() {
        let key = Key::generate(KeySpec::P384).expect("should generate");
        assert_eq!(key.try_sign(MSG).expect("should sign").len(), 96);
    }

    #[test]
    fn altered_message_fails() {
        for spec in [KeySpec::Rsa2048, KeySpec::P256] {
            let key = Key::generate(spec).expect("should generate");
            let sig = key.try_sign(MSG).expect("should sign");

            let err = spec.algorithm().verify(b"something else", &sig, key.public_jwk());
            assert!(err.is_err());
        }
    }

    #[test]
    fn wrong_key_fails() {
        let key = Key::generate(KeySpec::P256).expect("should generate");
        let other = Key::generate(KeySpec::P256).expect("should generate");
        let sig = key.try_sign(MSG).expect("should sign");

        assert!(Algorithm::ES256.verify(MSG, &sig, other.public_jwk()).is_err());
    }

    #[test]
    fn algorithm_key_mismatch_fails() {
        let key = Key::generate(KeySpec::P256).expect("should generate");
        let sig = key.try_sign(MSG).expect("should sign");

        assert!(Algorithm::RS256.verify(MSG, &sig, key.public_jwk()).is_err());
        assert!(Algorithm::ES384.verify(MSG, &sig, key.public_jwk()).is_err());
        assert!(Algorithm::ES512.verify(MSG, &sig, key.public_jwk()).is_err());
    }

    #[test]
    fn rsa_digest_must_match() {
        let key = Key::generate(KeySpec::Rsa2048).expect("should generate");
        let sig = key.try_sign(MSG).expect("should sign");

        assert!(Algorithm::RS384.verify(MSG, &sig, key.public_jwk()).is_err());
        assert!(Algorithm::RS512.verify(MSG, &sig, key.public_jwk()).is_err());
    }
}

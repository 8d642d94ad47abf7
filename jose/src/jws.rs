//! # JSON Web Signature (JWS)
//!
//! JWS ([RFC7515]) represents content secured with digital signatures using
//! JSON-based data structures. Cryptographic algorithms and identifiers for use
//! with this specification are described in the JWA ([RFC7518]) specification.
//!
//! Statements are always produced in the compact serialization. Parsing also
//! accepts the general and flattened JSON serializations so that a
//! multi-signature JWS can be recognised (and refused) by the caller.
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515
//! [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518

use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use base64ct::{Base64UrlUnpadded, Encoding};
use credibil_keys::{Algorithm, PublicKeyJwk, Signer};
use serde::{Deserialize, Serialize};

/// JWS definition.
///
/// Segments are held exactly as received so verification runs over the
/// original bytes rather than a re-encoding.
#[derive(Clone, Debug, Serialize)]
pub struct Jws {
    /// The base64url encoded payload.
    pub payload: String,

    /// JWS signatures.
    pub signatures: Vec<Signature>,
}

impl Jws {
    /// The single signature of the JWS.
    ///
    /// # Errors
    ///
    /// Returns an error unless the JWS carries exactly one signature.
    pub fn signature(&self) -> Result<&Signature> {
        match self.signatures.as_slice() {
            [signature] => Ok(signature),
            [] => bail!("no signature found"),
            _ => bail!("unexpected multi-signature JWS ({} signatures)", self.signatures.len()),
        }
    }

    /// Decode the payload WITHOUT verifying any signature.
    ///
    /// Nothing read from these bytes may be trusted. They are only useful to
    /// locate the key needed for [`Jws::verify`].
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid base64url.
    pub fn unverified_payload(&self) -> Result<Vec<u8>> {
        Base64UrlUnpadded::decode_vec(&self.payload)
            .map_err(|e| anyhow!("issue decoding payload: {e}"))
    }

    /// Verify the JWS signature with `jwk`, returning the verified payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the JWS does not carry exactly one signature, if
    /// `jwk` declares an algorithm other than the header's, or if the
    /// signature does not verify.
    pub fn verify(&self, jwk: &PublicKeyJwk) -> Result<Vec<u8>> {
        tracing::debug!("verify");

        let signature = self.signature()?;
        let alg = signature.header.alg;
        if let Some(key_alg) = jwk.alg
            && key_alg != alg
        {
            bail!("key algorithm {key_alg} does not match header algorithm {alg}");
        }

        let sig = Base64UrlUnpadded::decode_vec(&signature.signature)
            .map_err(|e| anyhow!("issue decoding signature: {e}"))?;
        let signing_input = format!("{}.{}", signature.protected, self.payload);
        alg.verify(signing_input.as_bytes(), &sig, jwk)?;

        self.unverified_payload()
    }

    /// Serialize to the compact form `header.payload.signature`.
    ///
    /// # Errors
    ///
    /// Returns an error unless the JWS carries exactly one signature.
    pub fn encode(&self) -> Result<String> {
        let signature = self.signature()?;
        Ok(format!("{}.{}.{}", signature.protected, self.payload, signature.signature))
    }
}

impl FromStr for Jws {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.starts_with('{') {
            return from_json(s);
        }

        let parts = s.split('.').collect::<Vec<&str>>();
        let [protected, payload, signature] = parts.as_slice() else {
            bail!("invalid Compact JWS format");
        };

        Ok(Self {
            payload: (*payload).to_string(),
            signatures: vec![Signature::new(protected, signature)?],
        })
    }
}

// General or flattened JWS JSON serialization.
fn from_json(s: &str) -> Result<Jws> {
    #[derive(Deserialize)]
    struct JsonJws {
        payload: String,
        protected: Option<String>,
        signature: Option<String>,
        signatures: Option<Vec<JsonSignature>>,
    }

    #[derive(Deserialize)]
    struct JsonSignature {
        protected: String,
        signature: String,
    }

    let json: JsonJws =
        serde_json::from_str(s).map_err(|e| anyhow!("issue deserializing JWS JSON: {e}"))?;

    let signatures = match (json.signatures, json.protected, json.signature) {
        (Some(signatures), None, None) => signatures
            .iter()
            .map(|sig| Signature::new(&sig.protected, &sig.signature))
            .collect::<Result<Vec<_>>>()?,
        (None, Some(protected), Some(signature)) => vec![Signature::new(&protected, &signature)?],
        _ => bail!("JWS JSON must be either general or flattened"),
    };

    Ok(Jws {
        payload: json.payload,
        signatures,
    })
}

/// An entry of the `signatures` array in a general JWS.
#[derive(Clone, Debug, Serialize)]
pub struct Signature {
    /// The base64url encoded JWS protected header, as received.
    pub protected: String,

    /// The decoded protected header.
    #[serde(skip)]
    pub header: Protected,

    /// The base64url encoded JWS signature.
    pub signature: String,
}

impl Signature {
    fn new(protected: &str, signature: &str) -> Result<Self> {
        let decoded = Base64UrlUnpadded::decode_vec(protected)
            .map_err(|e| anyhow!("issue decoding header: {e}"))?;
        let header: Protected = serde_json::from_slice(&decoded)
            .map_err(|e| anyhow!("issue deserializing header: {e}"))?;

        if let Some(crit) = &header.crit {
            bail!("unsupported critical header parameters: {}", crit.join(", "));
        }

        Ok(Self {
            protected: protected.to_string(),
            header,
            signature: signature.to_string(),
        })
    }
}

/// JWS protected header.
///
/// N.B. Only the parameters used by entity statements are modelled. Others
/// are ignored, apart from `crit`, which is refused since no extension is
/// understood.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Protected {
    /// Digital signature algorithm identifier. Parsing fails for any algorithm
    /// outside [`Algorithm`].
    pub alg: Algorithm,

    /// Used to declare the media type [IANA.MediaTypes] of the JWS.
    ///
    /// [IANA.MediaTypes]: (http://www.iana.org/assignments/media-types)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// Identifier of the key that produced the signature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Extensions that must be understood by the recipient.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crit: Option<Vec<String>>,
}

impl Protected {
    /// Returns the `kid`, if present and non-empty.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref().filter(|kid| !kid.is_empty())
    }
}

/// Builder for a single-signature JWS.
#[derive(Clone, Debug, Default)]
pub struct JwsBuilder<P, S> {
    jwt_type: Option<String>,
    payload: P,
    signer: S,
}

#[doc(hidden)]
/// Typestate generic for a JWS builder with no payload.
pub struct NoPayload;
#[doc(hidden)]
/// Typestate generic for a JWS builder with a payload.
pub struct Payload(Vec<u8>);

#[doc(hidden)]
/// Typestate generic for a JWS builder with no signer.
pub struct NoSigner;
#[doc(hidden)]
/// Typestate generic for a JWS builder with a signer.
pub struct WithSigner<'a, S: Signer>(&'a S);

impl JwsBuilder<NoPayload, NoSigner> {
    /// Returns a new [`JwsBuilder`]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            jwt_type: None,
            payload: NoPayload,
            signer: NoSigner,
        }
    }

    /// Set the payload bytes to be signed.
    #[must_use]
    pub fn payload(self, payload: impl Into<Vec<u8>>) -> JwsBuilder<Payload, NoSigner> {
        JwsBuilder {
            jwt_type: self.jwt_type,
            payload: Payload(payload.into()),
            signer: NoSigner,
        }
    }
}

impl<P, S> JwsBuilder<P, S> {
    /// Specify the `typ` header.
    #[must_use]
    pub fn jwt_type(mut self, jwt_type: impl Into<String>) -> Self {
        self.jwt_type = Some(jwt_type.into());
        self
    }

    /// Capture the signer for use in the final build step.
    #[must_use]
    pub fn add_signer<T: Signer>(self, signer: &T) -> JwsBuilder<P, WithSigner<'_, T>> {
        JwsBuilder {
            jwt_type: self.jwt_type,
            payload: self.payload,
            signer: WithSigner(signer),
        }
    }
}

impl<S: Signer> JwsBuilder<Payload, WithSigner<'_, S>> {
    /// Generate the JWS.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be serialized or signing fails.
    ///
    /// # Panics
    ///
    /// Panics if the signer has no key identifier. Every key generated by
    /// `credibil-keys` carries one.
    pub fn build(self) -> Result<Jws> {
        let signer = self.signer.0;
        let kid = signer.key_id();
        assert!(!kid.is_empty(), "signing key must have a kid");

        let header = Protected {
            alg: signer.algorithm(),
            typ: self.jwt_type,
            kid: Some(kid.to_string()),
            crit: None,
        };

        let protected = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&header)?);
        let payload = Base64UrlUnpadded::encode_string(&self.payload.0);
        let sig = signer.try_sign(format!("{protected}.{payload}").as_bytes())?;

        tracing::debug!(kid, alg = %header.alg, "signed JWS");
        Ok(Jws {
            payload,
            signatures: vec![Signature {
                protected,
                header,
                signature: Base64UrlUnpadded::encode_string(&sig),
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use credibil_keys::{Key, KeySpec};
    use serde_json::json;

    use super::*;

    fn b64(value: &serde_json::Value) -> String {
        Base64UrlUnpadded::encode_string(value.to_string().as_bytes())
    }

    // sign with `key` over an arbitrary header/payload pair
    fn compact(key: &Key, header: &serde_json::Value, payload: &[u8]) -> String {
        let protected = b64(header);
        let payload = Base64UrlUnpadded::encode_string(payload);
        let sig = key.try_sign(format!("{protected}.{payload}").as_bytes()).expect("should sign");
        format!("{protected}.{payload}.{}", Base64UrlUnpadded::encode_string(&sig))
    }

    #[test]
    fn round_trip() {
        let key = Key::generate(KeySpec::P256).expect("should generate");
        let jws = JwsBuilder::new()
            .payload(b"hello".to_vec())
            .jwt_type("example+jwt")
            .add_signer(&key)
            .build()
            .expect("should build");

        let compact = jws.encode().expect("should encode");
        let parsed: Jws = compact.parse().expect("should parse");

        let header = &parsed.signature().expect("one signature").header;
        assert_eq!(header.alg, Algorithm::ES256);
        assert_eq!(header.typ.as_deref(), Some("example+jwt"));
        assert_eq!(header.kid(), Some(key.kid()));

        let payload = parsed.verify(key.public_jwk()).expect("should verify");
        assert_eq!(payload, b"hello");
    }

    #[test]
    fn no_type_header_by_default() {
        let key = Key::generate(KeySpec::P256).expect("should generate");
        let jws = JwsBuilder::new().payload("token").add_signer(&key).build().expect("should build");

        let compact = jws.encode().expect("should encode");
        let header = compact.split('.').next().expect("header segment");
        let header = Base64UrlUnpadded::decode_vec(header).expect("should decode");
        let header: serde_json::Value = serde_json::from_slice(&header).expect("should parse");
        assert_eq!(header, json!({"alg": "ES256", "kid": key.kid()}));
    }

    // the signature covers the header bytes as sent, not a re-encoding
    #[test]
    fn verifies_original_header_bytes() {
        let key = Key::generate(KeySpec::P384).expect("should generate");
        let header = json!({"kid": key.kid(), "x-extra": [1, 2, 3], "alg": "ES384"});
        let jws: Jws = compact(&key, &header, b"{}").parse().expect("should parse");

        jws.verify(key.public_jwk()).expect("should verify");
    }

    #[test]
    fn key_algorithm_must_match_header() {
        let key = Key::generate(KeySpec::P256).expect("should generate");
        let mut jwk = key.public_jwk().clone();
        jwk.alg = Some(Algorithm::ES384);

        let jws = JwsBuilder::new().payload("x").add_signer(&key).build().expect("should build");
        assert!(jws.verify(&jwk).is_err());
    }

    #[test]
    fn rejects_disallowed_algorithms() {
        for alg in ["none", "HS256", "PS256", "EdDSA"] {
            let header = b64(&json!({"alg": alg, "kid": "k"}));
            let compact = format!("{header}.e30.c2ln");
            assert!(compact.parse::<Jws>().is_err(), "{alg} should be refused");
        }
    }

    #[test]
    fn rejects_critical_extensions() {
        let header = b64(&json!({"alg": "ES256", "kid": "k", "crit": ["exp"]}));
        assert!(format!("{header}.e30.c2ln").parse::<Jws>().is_err());
    }

    #[test]
    fn rejects_bad_segments() {
        assert!("a.b".parse::<Jws>().is_err());
        assert!("a.b.c.d".parse::<Jws>().is_err());
        assert!("!!!.e30.c2ln".parse::<Jws>().is_err());
    }

    #[test]
    fn parses_general_json() {
        let key = Key::generate(KeySpec::P256).expect("should generate");
        let other = Key::generate(KeySpec::P256).expect("should generate");

        let first = compact(&key, &json!({"alg": "ES256", "kid": key.kid()}), b"{}");
        let second = compact(&other, &json!({"alg": "ES256", "kid": other.kid()}), b"{}");
        let [p1, payload, s1] = first.split('.').collect::<Vec<_>>()[..] else { panic!() };
        let [p2, _, s2] = second.split('.').collect::<Vec<_>>()[..] else { panic!() };

        let general = json!({
            "payload": payload,
            "signatures": [
                {"protected": p1, "signature": s1},
                {"protected": p2, "signature": s2},
            ]
        });
        let jws: Jws = general.to_string().parse().expect("should parse");

        assert_eq!(jws.signatures.len(), 2);
        assert!(jws.signature().is_err());
        assert!(jws.verify(key.public_jwk()).is_err());
        assert!(jws.encode().is_err());
    }

    #[test]
    fn parses_flattened_json() {
        let key = Key::generate(KeySpec::P256).expect("should generate");
        let compact = compact(&key, &json!({"alg": "ES256", "kid": key.kid()}), b"{}");
        let [protected, payload, signature] = compact.split('.').collect::<Vec<_>>()[..] else {
            panic!()
        };

        let flattened = json!({"payload": payload, "protected": protected, "signature": signature});
        let jws: Jws = flattened.to_string().parse().expect("should parse");

        assert_eq!(jws.encode().expect("should encode"), compact);
        jws.verify(key.public_jwk()).expect("should verify");
    }

    #[test]
    fn rejects_mixed_json() {
        let header = b64(&json!({"alg": "ES256", "kid": "k"}));
        let mixed = json!({
            "payload": "e30",
            "protected": header,
            "signature": "c2ln",
            "signatures": [{"protected": header, "signature": "c2ln"}]
        });
        assert!(mixed.to_string().parse::<Jws>().is_err());
    }

    #[test]
    fn kid_accessor_ignores_empty() {
        let header = Protected {
            alg: Algorithm::RS256,
            typ: None,
            kid: Some(String::new()),
            crit: None,
        };
        assert!(header.kid().is_none());
    }
}

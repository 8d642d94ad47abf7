//! # Entity Configuration
//!
//! An Entity Configuration is the statement an entity issues about itself
//! ([OpenID Federation 3]): issuer and subject are both the entity's own
//! identifier, and the statement is signed with one of the keys it publishes in
//! `jwks`.
//!
//! [OpenID Federation 3]: https://openid.net/specs/openid-federation-1_0-41.html#section-3

use chrono::Utc;
use credibil_jose::{Jws, JwsBuilder};
use credibil_keys::{Jwks, PublicKeyJwk, Signer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metadata::{Metadata, TypedMetadata};
use crate::{ENTITY_STATEMENT_TYPE, Error, Identifier, Rejection, Result};

/// Seconds an Entity Configuration remains valid after it is issued.
pub const VALIDITY_SECS: i64 = 3600;

/// The claims of an Entity Configuration.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct EntityConfiguration {
    /// The entity issuing the statement.
    #[serde(rename = "iss")]
    pub issuer: Identifier,

    /// The entity the statement is about. The same as `issuer`.
    #[serde(rename = "sub")]
    pub subject: Identifier,

    /// Time of issue, in seconds since the Unix epoch.
    #[serde(rename = "iat")]
    pub issued_at: i64,

    /// Expiry time, in seconds since the Unix epoch.
    #[serde(rename = "exp")]
    pub expires_at: i64,

    /// The entity's federation signing keys.
    #[serde(rename = "jwks")]
    pub federation_entity_keys: Jwks,

    /// Immediate superiors of the entity. Empty for a trust anchor.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authority_hints: Vec<Identifier>,

    /// Metadata for each entity type the entity acts as.
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl EntityConfiguration {
    /// Create a configuration for `identifier`, issued now.
    #[must_use]
    pub fn new(identifier: Identifier, federation_entity_keys: Jwks, metadata: Metadata) -> Self {
        let issued_at = Utc::now().timestamp();
        Self {
            issuer: identifier.clone(),
            subject: identifier,
            issued_at,
            expires_at: issued_at + VALIDITY_SECS,
            federation_entity_keys,
            authority_hints: Vec::new(),
            metadata,
        }
    }

    /// Sign the configuration, producing an `entity-statement+jwt`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] if serializing or signing fails.
    ///
    /// # Panics
    ///
    /// Panics if `signer` has no key identifier.
    pub fn sign(&self, signer: &impl Signer) -> Result<Jws> {
        let payload = serde_json::to_vec(self).map_err(|e| Error::Signing(e.to_string()))?;
        JwsBuilder::new()
            .jwt_type(ENTITY_STATEMENT_TYPE)
            .payload(payload)
            .add_signer(signer)
            .build()
            .map_err(|e| Error::Signing(e.to_string()))
    }

    /// Typed metadata for `T`'s entity type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MetadataNotFound`] if the configuration has no metadata
    /// for the entity type.
    pub fn metadata<T: TypedMetadata>(&self) -> Result<&T> {
        self.metadata.find()
    }

    /// Validate an Entity Configuration received from an untrusted source.
    ///
    /// Accepts the compact serialization as well as the JWS JSON
    /// serializations. The statement must carry exactly one signature, typed
    /// `entity-statement+jwt`, made by the key its `kid` names in the
    /// statement's own `jwks`.
    ///
    /// No claim is read before the signature verifies apart from `jwks`, which
    /// is only used to find the verification key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] if the statement fails any check.
    pub fn validate(statement: &str) -> Result<Self> {
        verify(statement).map_err(|rejection| {
            tracing::warn!(%rejection, "rejected entity configuration");
            Error::Rejected(rejection)
        })
    }
}

fn verify(statement: &str) -> Result<EntityConfiguration, Rejection> {
    tracing::debug!("validate entity configuration");

    let jws = statement
        .parse::<Jws>()
        .map_err(|e| Rejection::MalformedSignature(e.to_string()))?;
    let signature = jws.signature().map_err(|e| Rejection::MalformedSignature(e.to_string()))?;

    let header = &signature.header;
    if header.typ.as_deref() != Some(ENTITY_STATEMENT_TYPE) {
        return Err(Rejection::MissingTypeHeader);
    }
    let kid = header.kid().ok_or(Rejection::MissingKeyId)?;

    // untrusted: only used to find the verification key
    #[derive(Deserialize)]
    struct Untrusted {
        jwks: UntrustedJwks,
    }
    #[derive(Deserialize)]
    struct UntrustedJwks {
        keys: Vec<Value>,
    }
    let unverified =
        jws.unverified_payload().map_err(|e| Rejection::MalformedPayload(e.to_string()))?;
    let Untrusted { jwks } = serde_json::from_slice(&unverified)
        .map_err(|e| Rejection::MalformedPayload(e.to_string()))?;

    // other published keys may be of any type, only the signing key is parsed
    let matches = jwks
        .keys
        .iter()
        .filter(|key| key.get("kid").and_then(Value::as_str) == Some(kid))
        .collect::<Vec<_>>();
    let [jwk] = matches.as_slice() else {
        return Err(Rejection::UnknownSigningKey {
            kid: kid.to_string(),
            matches: matches.len(),
        });
    };
    let jwk = PublicKeyJwk::deserialize(*jwk).map_err(|e| {
        Rejection::SignatureVerificationFailed(format!("unsupported signing key: {e}"))
    })?;

    let payload =
        jws.verify(&jwk).map_err(|e| Rejection::SignatureVerificationFailed(e.to_string()))?;
    serde_json::from_slice(&payload).map_err(|e| Rejection::MalformedPayload(e.to_string()))
}

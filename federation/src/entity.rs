//! # Federation Entity
//!
//! An [`Entity`] owns its identifier and keys and produces signed Entity
//! Configurations on demand. Serving them over HTTP lives in
//! [`crate::server`].

use credibil_jose::{Jws, JwsBuilder};
use credibil_keys::{Jwks, KeySet, KeySpec};
use serde::Deserialize;
use url::Url;

use crate::metadata::{
    AcmeIssuerMetadata, AcmeRequestorMetadata, EntityMetadata, FederationEntityMetadata, Metadata,
};
use crate::{
    EntityConfiguration, Error, FEDERATION_FETCH_ENDPOINT, FEDERATION_LIST_ENDPOINT,
    FEDERATION_RESOLVE_ENDPOINT, Identifier, Result,
};

/// Federation signing keys generated for every entity.
const FEDERATION_KEY_SPECS: &[KeySpec] = &[KeySpec::Rsa2048];

/// Keys generated for an entity that requests certificates.
const ACME_REQUESTOR_KEY_SPECS: &[KeySpec] = &[KeySpec::Rsa2048, KeySpec::P256];

/// Optional capabilities of an entity.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EntityOptions {
    /// Generate certifiable keys and advertise `acme_requestor` metadata.
    pub is_acme_requestor: bool,

    /// Advertise `acme_issuer` metadata pointing at this ACME directory.
    pub acme_issuer: Option<Url>,
}

/// A federation entity: an identifier plus the keys it signs with.
///
/// Identity and keys are fixed once the entity is created.
#[derive(Debug)]
pub struct Entity {
    identifier: Identifier,
    federation_entity_keys: KeySet,
    acme_requestor_keys: Option<KeySet>,
    acme_directory: Option<Url>,
}

impl Entity {
    /// Create an entity, generating its keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] if `identifier` is not a valid
    /// entity identifier, or [`Error::KeyGeneration`] if generating a key
    /// fails.
    pub fn new(identifier: &str, options: EntityOptions) -> Result<Self> {
        let identifier = Identifier::parse(identifier)?;

        let federation_entity_keys = KeySet::generate(FEDERATION_KEY_SPECS)
            .map_err(|e| Error::KeyGeneration(e.to_string()))?;
        let acme_requestor_keys = if options.is_acme_requestor {
            let keys = KeySet::generate(ACME_REQUESTOR_KEY_SPECS)
                .map_err(|e| Error::KeyGeneration(e.to_string()))?;
            Some(keys)
        } else {
            None
        };

        tracing::info!(
            %identifier,
            acme_requestor = acme_requestor_keys.is_some(),
            acme_issuer = options.acme_issuer.is_some(),
            "created entity"
        );

        Ok(Self {
            identifier,
            federation_entity_keys,
            acme_requestor_keys,
            acme_directory: options.acme_issuer,
        })
    }

    /// The entity's identifier.
    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// The public federation signing keys.
    #[must_use]
    pub fn federation_entity_keys(&self) -> Jwks {
        self.federation_entity_keys.public()
    }

    /// The public certifiable keys, if the entity is an ACME requestor.
    #[must_use]
    pub fn certifiable_keys(&self) -> Option<Jwks> {
        self.acme_requestor_keys.as_ref().map(KeySet::public)
    }

    /// The entity's current, unsigned configuration.
    #[must_use]
    pub fn configuration(&self) -> EntityConfiguration {
        let mut metadata = Metadata::default();
        metadata.insert(EntityMetadata::FederationEntity(FederationEntityMetadata {
            fetch_endpoint: FEDERATION_FETCH_ENDPOINT.to_string(),
            list_endpoint: FEDERATION_LIST_ENDPOINT.to_string(),
            resolve_endpoint: FEDERATION_RESOLVE_ENDPOINT.to_string(),
        }));
        if let Some(certifiable_keys) = self.certifiable_keys() {
            metadata.insert(EntityMetadata::AcmeRequestor(AcmeRequestorMetadata {
                certifiable_keys,
            }));
        }
        if let Some(directory) = &self.acme_directory {
            metadata.insert(EntityMetadata::AcmeIssuer(AcmeIssuerMetadata {
                directory: directory.clone(),
            }));
        }

        EntityConfiguration::new(self.identifier.clone(), self.federation_entity_keys(), metadata)
    }

    /// Build and sign the entity's current configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] if signing fails.
    ///
    /// # Panics
    ///
    /// Panics if the entity has no federation signing key, which [`Entity::new`]
    /// always generates.
    pub fn entity_configuration(&self) -> Result<Jws> {
        let signer =
            self.federation_entity_keys.first().expect("entity should have a federation key");
        self.configuration().sign(signer)
    }

    /// Sign `token` with the entity's first certifiable key.
    ///
    /// The JWS header carries only that key's `alg` and `kid`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAcmeRequestorKey`] if the entity is not an ACME
    /// requestor, or [`Error::Signing`] if signing fails.
    pub fn sign_challenge(&self, token: &[u8]) -> Result<Jws> {
        let signer = self
            .acme_requestor_keys
            .as_ref()
            .and_then(KeySet::first)
            .ok_or(Error::NoAcmeRequestorKey)?;

        JwsBuilder::new()
            .payload(token)
            .add_signer(signer)
            .build()
            .map_err(|e| Error::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use credibil_keys::Algorithm;

    use super::*;

    #[test]
    fn federation_key_only() {
        let entity = Entity::new("https://example.com", EntityOptions::default())
            .expect("should create entity");

        let jwks = entity.federation_entity_keys();
        assert_eq!(jwks.keys.len(), 1);
        assert_eq!(jwks.keys[0].alg, Some(Algorithm::RS256));
        assert!(entity.certifiable_keys().is_none());

        let config = entity.configuration();
        assert_eq!(config.metadata.len(), 1);
        assert!(config.metadata::<FederationEntityMetadata>().is_ok());
    }

    #[test]
    fn acme_capabilities() {
        let options = EntityOptions {
            is_acme_requestor: true,
            acme_issuer: Some(Url::parse("https://acme.example/directory").expect("should parse")),
        };
        let entity = Entity::new("https://example.com", options).expect("should create entity");

        let certifiable = entity.certifiable_keys().expect("should have certifiable keys");
        let algs = certifiable.keys.iter().map(|jwk| jwk.alg).collect::<Vec<_>>();
        assert_eq!(algs, vec![Some(Algorithm::RS256), Some(Algorithm::ES256)]);

        let config = entity.configuration();
        let requestor = config.metadata::<AcmeRequestorMetadata>().expect("should have metadata");
        assert_eq!(requestor.certifiable_keys, certifiable);
        let issuer = config.metadata::<AcmeIssuerMetadata>().expect("should have metadata");
        assert_eq!(issuer.directory.as_str(), "https://acme.example/directory");
    }

    #[test]
    fn invalid_identifier() {
        let err = Entity::new("http://example.com", EntityOptions::default())
            .expect_err("should reject identifier");
        assert!(matches!(err, Error::InvalidIdentifier { .. }));
    }

    #[test]
    fn options_from_json() {
        let options: EntityOptions =
            serde_json::from_str(r#"{"is_acme_requestor": true}"#).expect("should deserialize");
        assert!(options.is_acme_requestor);
        assert!(options.acme_issuer.is_none());
    }
}

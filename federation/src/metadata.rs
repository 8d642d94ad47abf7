//! # Entity Metadata
//!
//! Entity configurations carry one metadata object per entity type the entity
//! acts as ([OpenID Federation 5.1]). Each entity type has a fixed shape, so
//! metadata is modelled as a map from [`EntityType`] to [`EntityMetadata`],
//! serialized as a JSON object keyed by entity type identifier.
//!
//! [OpenID Federation 5.1]: https://openid.net/specs/openid-federation-1_0-41.html#section-5.1

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use credibil_keys::Jwks;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use url::Url;

use crate::{Error, Result};

/// Entity type identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityType {
    /// `federation_entity`
    FederationEntity,

    /// `acme_requestor`: the entity may request certificates for its keys.
    AcmeRequestor,

    /// `acme_issuer`: the entity issues certificates through an ACME server.
    AcmeIssuer,
}

impl EntityType {
    /// The entity type identifier used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FederationEntity => "federation_entity",
            Self::AcmeRequestor => "acme_requestor",
            Self::AcmeIssuer => "acme_issuer",
        }
    }
}

impl Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "federation_entity" => Ok(Self::FederationEntity),
            "acme_requestor" => Ok(Self::AcmeRequestor),
            "acme_issuer" => Ok(Self::AcmeIssuer),
            _ => Err(format!("unknown entity type {s}")),
        }
    }
}

/// Metadata for the `federation_entity` entity type.
///
/// [OpenID Federation 5.1.1](https://openid.net/specs/openid-federation-1_0-41.html#section-5.1.1)
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct FederationEntityMetadata {
    /// Fetch endpoint.
    #[serde(rename = "federation_fetch_endpoint")]
    pub fetch_endpoint: String,

    /// Subordinate listing endpoint.
    #[serde(rename = "federation_list_endpoint")]
    pub list_endpoint: String,

    /// Resolve endpoint.
    #[serde(rename = "federation_resolve_endpoint")]
    pub resolve_endpoint: String,
}

/// Metadata for the `acme_requestor` entity type: the keys the entity may
/// request certificates for.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AcmeRequestorMetadata {
    /// Public keys that may be certified.
    #[serde(rename = "jwks")]
    pub certifiable_keys: Jwks,
}

/// Metadata for the `acme_issuer` entity type.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AcmeIssuerMetadata {
    /// Location of the ACME server directory.
    pub directory: Url,
}

/// Metadata for a single entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityMetadata {
    /// `federation_entity` metadata.
    FederationEntity(FederationEntityMetadata),

    /// `acme_requestor` metadata.
    AcmeRequestor(AcmeRequestorMetadata),

    /// `acme_issuer` metadata.
    AcmeIssuer(AcmeIssuerMetadata),
}

impl EntityMetadata {
    /// The entity type this metadata describes.
    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        match self {
            Self::FederationEntity(_) => EntityType::FederationEntity,
            Self::AcmeRequestor(_) => EntityType::AcmeRequestor,
            Self::AcmeIssuer(_) => EntityType::AcmeIssuer,
        }
    }
}

/// Metadata types that can be looked up by their entity type.
pub trait TypedMetadata: Sized {
    /// The entity type the metadata belongs to.
    const ENTITY_TYPE: EntityType;

    /// Borrow the typed metadata from a metadata entry of the same type.
    fn from_entry(entry: &EntityMetadata) -> Option<&Self>;
}

impl TypedMetadata for FederationEntityMetadata {
    const ENTITY_TYPE: EntityType = EntityType::FederationEntity;

    fn from_entry(entry: &EntityMetadata) -> Option<&Self> {
        match entry {
            EntityMetadata::FederationEntity(metadata) => Some(metadata),
            _ => None,
        }
    }
}

impl TypedMetadata for AcmeRequestorMetadata {
    const ENTITY_TYPE: EntityType = EntityType::AcmeRequestor;

    fn from_entry(entry: &EntityMetadata) -> Option<&Self> {
        match entry {
            EntityMetadata::AcmeRequestor(metadata) => Some(metadata),
            _ => None,
        }
    }
}

impl TypedMetadata for AcmeIssuerMetadata {
    const ENTITY_TYPE: EntityType = EntityType::AcmeIssuer;

    fn from_entry(entry: &EntityMetadata) -> Option<&Self> {
        match entry {
            EntityMetadata::AcmeIssuer(metadata) => Some(metadata),
            _ => None,
        }
    }
}

/// Metadata keyed by entity type, at most one entry per type.
///
/// Entries for entity types not modelled by [`EntityType`] are kept as
/// received and serialized back unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<EntityType, EntityMetadata>,
    unrecognized: BTreeMap<String, Value>,
}

impl Metadata {
    /// Add metadata, replacing any existing entry for the same entity type.
    pub fn insert(&mut self, metadata: EntityMetadata) {
        self.entries.insert(metadata.entity_type(), metadata);
    }

    /// The metadata entry for `entity_type`.
    #[must_use]
    pub fn get(&self, entity_type: EntityType) -> Option<&EntityMetadata> {
        self.entries.get(&entity_type)
    }

    /// The raw metadata for an entity type identifier not modelled by
    /// [`EntityType`], such as `openid_provider`.
    #[must_use]
    pub fn unrecognized(&self, entity_type: &str) -> Option<&Value> {
        self.unrecognized.get(entity_type)
    }

    /// The typed metadata for `T`'s entity type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MetadataNotFound`] if there is no entry for the entity
    /// type.
    pub fn find<T: TypedMetadata>(&self) -> Result<&T> {
        self.get(T::ENTITY_TYPE)
            .and_then(T::from_entry)
            .ok_or(Error::MetadataNotFound(T::ENTITY_TYPE))
    }

    /// The recognized entity types present, in a stable order.
    pub fn entity_types(&self) -> impl Iterator<Item = EntityType> + '_ {
        self.entries.keys().copied()
    }

    /// Number of entries, recognized or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len() + self.unrecognized.len()
    }

    /// Returns `true` if there is no metadata.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.unrecognized.is_empty()
    }
}

impl FromIterator<EntityMetadata> for Metadata {
    fn from_iter<I: IntoIterator<Item = EntityMetadata>>(iter: I) -> Self {
        let mut metadata = Self::default();
        for entry in iter {
            metadata.insert(entry);
        }
        metadata
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (entity_type, entry) in &self.entries {
            match entry {
                EntityMetadata::FederationEntity(m) => map.serialize_entry(entity_type.as_str(), m)?,
                EntityMetadata::AcmeRequestor(m) => map.serialize_entry(entity_type.as_str(), m)?,
                EntityMetadata::AcmeIssuer(m) => map.serialize_entry(entity_type.as_str(), m)?,
            }
        }
        for (entity_type, value) in &self.unrecognized {
            map.serialize_entry(entity_type, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MetadataVisitor)
    }
}

struct MetadataVisitor;

impl<'de> Visitor<'de> for MetadataVisitor {
    type Value = Metadata;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of entity type identifiers to metadata")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut metadata = Metadata::default();

        while let Some(key) = map.next_key::<String>()? {
            let Ok(entity_type) = key.parse::<EntityType>() else {
                tracing::debug!(entity_type = %key, "keeping unrecognized metadata");
                if metadata.unrecognized.contains_key(&key) {
                    return Err(de::Error::custom(format!("duplicate metadata for {key}")));
                }
                let value = map.next_value::<Value>()?;
                metadata.unrecognized.insert(key, value);
                continue;
            };
            if metadata.entries.contains_key(&entity_type) {
                return Err(de::Error::custom(format!("duplicate metadata for {entity_type}")));
            }

            let entry = match entity_type {
                EntityType::FederationEntity => EntityMetadata::FederationEntity(map.next_value()?),
                EntityType::AcmeRequestor => EntityMetadata::AcmeRequestor(map.next_value()?),
                EntityType::AcmeIssuer => EntityMetadata::AcmeIssuer(map.next_value()?),
            };
            metadata.insert(entry);
        }

        Ok(metadata)
    }
}

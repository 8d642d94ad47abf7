//! # OpenID Federation Entity
//!
//! A federation entity publishes a self-signed Entity Configuration
//! ([OpenID Federation 3]) at `/.well-known/openid-federation`, describing its
//! identifier, its federation signing keys and what it can do: request
//! certificates for its keys (`acme_requestor`) or issue them through an ACME
//! server (`acme_issuer`).
//!
//! This crate creates entities and their keys, signs their configurations,
//! serves them over HTTP and validates configurations received from other
//! entities.
//!
//! [OpenID Federation 3]: https://openid.net/specs/openid-federation-1_0-41.html#section-3
//!
//! # Example
//!
//! ```rust,no_run
//! use credibil_federation::{Entity, EntityConfiguration, EntityOptions};
//!
//! let entity = Entity::new("https://issuer.example:8443", EntityOptions::default())?;
//! let compact = entity.entity_configuration()?.encode()?;
//!
//! let config = EntityConfiguration::validate(&compact)?;
//! assert_eq!(config.issuer, *entity.identifier());
//! # Ok::<(), anyhow::Error>(())
//! ```

mod entity;
mod error;
mod identifier;
pub mod metadata;
mod server;
mod statement;

pub use credibil_jose::{Jws, JwsBuilder};
pub use credibil_keys::{Algorithm, Jwks, Key, KeySet, KeySpec, PublicKeyJwk, Signer};

pub use self::entity::{Entity, EntityOptions};
pub use self::error::{Error, Rejection, Result};
pub use self::identifier::Identifier;
pub use self::metadata::{
    AcmeIssuerMetadata, AcmeRequestorMetadata, EntityMetadata, EntityType,
    FederationEntityMetadata, Metadata, TypedMetadata,
};
pub use self::server::{ServingHandle, router};
pub use self::statement::{EntityConfiguration, VALIDITY_SECS};

/// JWS `typ` of an entity statement.
pub const ENTITY_STATEMENT_TYPE: &str = "entity-statement+jwt";

/// Well-known path of an entity's configuration.
pub const ENTITY_CONFIGURATION_PATH: &str = "/.well-known/openid-federation";

/// Content type an entity configuration is served with.
pub const ENTITY_CONFIGURATION_CONTENT_TYPE: &str = "application/entity-statement+jwt";

/// Path of the fetch endpoint.
pub const FEDERATION_FETCH_ENDPOINT: &str = "/federation-fetch";

/// Path of the subordinate listing endpoint.
pub const FEDERATION_LIST_ENDPOINT: &str = "/federation-list";

/// Path of the resolve endpoint.
pub const FEDERATION_RESOLVE_ENDPOINT: &str = "/federation-resolve";

//! # Entity Identifiers
//!
//! An entity is identified by an `https` URL with no query or fragment
//! component ([OpenID Federation 1.2]). Identifiers are compared by their
//! canonical string form.
//!
//! [OpenID Federation 1.2]: https://openid.net/specs/openid-federation-1_0-41.html#section-1.2-3.4

use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// A validated entity identifier.
///
/// Deserializing re-runs the same validation as [`Identifier::parse`].
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    url: Url,
    canonical: String,
}

impl Identifier {
    /// Parse and validate an entity identifier.
    ///
    /// Valid examples:
    /// - `https://example.com`
    /// - `https://example.com:8443`
    /// - `https://example.com/tenant/one`
    ///
    /// # Errors
    ///
    /// Will return [`Error::InvalidIdentifier`] if the input is not a URL, its
    /// scheme is not `https`, or it has a query or fragment (even an empty
    /// one).
    pub fn parse(identifier: &str) -> Result<Self> {
        let url = Url::parse(identifier)
            .map_err(|e| Error::invalid_identifier(identifier, e.to_string()))?;

        if url.scheme() != "https" {
            return Err(Error::invalid_identifier(identifier, "scheme must be https"));
        }
        if url.fragment().is_some() {
            return Err(Error::invalid_identifier(identifier, "has fragment"));
        }
        if url.query().is_some() {
            return Err(Error::invalid_identifier(identifier, "has query"));
        }

        // don't add a root path the input left out
        let mut canonical = url.to_string();
        if url.path() == "/" && !identifier.trim().ends_with('/') {
            canonical.pop();
        }

        Ok(Self { url, canonical })
    }

    /// Compare two possibly absent identifiers.
    ///
    /// Returns `true` only when both are present and equal: two absent
    /// identifiers do not match.
    #[must_use]
    pub fn matches(a: Option<&Self>, b: Option<&Self>) -> bool {
        matches!((a, b), (Some(a), Some(b)) if a == b)
    }

    /// The canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// The identifier's port: explicit, or the `https` default.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.url.port_or_known_default()
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Identifier> for String {
    fn from(identifier: Identifier) -> Self {
        identifier.canonical
    }
}

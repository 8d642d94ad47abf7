//! # Federation Errors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::metadata::EntityType;

/// Result type for federation entity operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by federation entity operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The identifier is not a valid entity identifier.
    #[error("identifier '{identifier}' is not a valid entity identifier: {reason}")]
    InvalidIdentifier {
        /// The rejected identifier.
        identifier: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Generating the entity's keys failed.
    #[error("issue generating keys: {0}")]
    KeyGeneration(String),

    /// An entity statement failed validation and must not be trusted.
    #[error("entity statement rejected: {0}")]
    Rejected(#[from] Rejection),

    /// The entity configuration carries no metadata for the entity type.
    #[error("could not find metadata for entity type {0}")]
    MetadataNotFound(EntityType),

    /// The entity has no `acme_requestor` keys to sign with.
    #[error("entity has no acme_requestor keys")]
    NoAcmeRequestorKey,

    /// Producing a signed statement failed.
    #[error("issue signing: {0}")]
    Signing(String),

    /// The federation endpoints could not be served.
    #[error("issue serving federation endpoints: {0}")]
    Serve(#[from] std::io::Error),
}

/// The reasons an untrusted entity statement is rejected.
///
/// Callers should treat every kind the same way; they are distinguished for
/// diagnostics only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The statement is not a parseable single-signature JWS using an
    /// accepted algorithm.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// The JWS header `typ` is missing or is not `entity-statement+jwt`.
    #[error("JWS header typ must be entity-statement+jwt")]
    MissingTypeHeader,

    /// The JWS header has no `kid`.
    #[error("JWS header must contain kid")]
    MissingKeyId,

    /// The payload is not a well-formed entity configuration.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The header `kid` does not identify exactly one key in the statement's
    /// own JWK Set.
    #[error("found {matches} keys matching kid '{kid}' in JWKS, expected exactly one")]
    UnknownSigningKey {
        /// The `kid` from the JWS header.
        kid: String,
        /// Number of matching keys.
        matches: usize,
    },

    /// The signature does not verify with the matched key.
    #[error("signature verification failed: {0}")]
    SignatureVerificationFailed(String),
}

impl Error {
    pub(crate) fn invalid_identifier(identifier: &str, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.to_string(),
            reason: reason.into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidIdentifier { .. } | Self::Rejected(_) => StatusCode::BAD_REQUEST,
            Self::MetadataNotFound(_) => StatusCode::NOT_FOUND,
            Self::KeyGeneration(_)
            | Self::NoAcmeRequestorKey
            | Self::Signing(_)
            | Self::Serve(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message() {
        let err = Error::from(Rejection::UnknownSigningKey {
            kid: "abc".to_string(),
            matches: 0,
        });
        assert_eq!(
            err.to_string(),
            "entity statement rejected: found 0 keys matching kid 'abc' in JWKS, expected exactly one"
        );
    }

    #[test]
    fn response_status() {
        let response = Error::Signing("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = Error::from(Rejection::MissingKeyId).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = Error::MetadataNotFound(EntityType::AcmeIssuer).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

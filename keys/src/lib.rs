//! # Key Management for Federation Entities
//!
//! Generates the asymmetric keys an entity signs with, derives each key's
//! `kid` from its JWK Thumbprint and its `alg` from the kind of key, and
//! projects key sets down to the public JWK Set that gets published.
//!
//! This crate provides common utilities for the Credibil federation crates and
//! is not intended to be used directly.

mod core;
mod jwk;
mod keyset;
mod sign;

pub use self::core::*;
pub use self::jwk::*;
pub use self::keyset::*;
pub use self::sign::*;

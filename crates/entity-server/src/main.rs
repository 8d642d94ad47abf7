//! # Entity Server
//!
//! Serves a federation entity's configuration until interrupted.
//!
//! Configured from the environment:
//!
//! - `ENTITY_IDENTIFIER`: the entity identifier (required), e.g.
//!   `https://issuer.example:8443`. The server listens on its port.
//! - `ENTITY_ACME_REQUESTOR`: `true` to generate certifiable keys.
//! - `ENTITY_ACME_DIRECTORY`: ACME directory URL to advertise as an issuer.
//! - `RUST_LOG`: log filter, `info` by default.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use credibil_federation::{Entity, EntityOptions};
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let identifier = env::var("ENTITY_IDENTIFIER").context("ENTITY_IDENTIFIER must be set")?;
    let options = options()?;

    let entity = Arc::new(Entity::new(&identifier, options)?);
    let handle = entity.serve().await?;

    tokio::signal::ctrl_c().await.context("issue waiting for shutdown signal")?;
    tracing::info!("shutting down");
    handle.stop().await;

    Ok(())
}

fn options() -> Result<EntityOptions> {
    let is_acme_requestor = match env::var("ENTITY_ACME_REQUESTOR") {
        Ok(value) => value.parse().context("ENTITY_ACME_REQUESTOR must be true or false")?,
        Err(_) => false,
    };
    let acme_issuer = env::var("ENTITY_ACME_DIRECTORY")
        .ok()
        .map(|directory| Url::parse(&directory))
        .transpose()
        .context("ENTITY_ACME_DIRECTORY must be a URL")?;

    Ok(EntityOptions {
        is_acme_requestor,
        acme_issuer,
    })
}

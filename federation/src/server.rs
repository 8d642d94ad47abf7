//! # Federation Endpoints
//!
//! Publishes an entity's configuration at its well-known location
//! ([OpenID Federation 9]). The fetch, list and resolve endpoints advertised in
//! `federation_entity` metadata are routed but not implemented.
//!
//! [OpenID Federation 9]: https://openid.net/specs/openid-federation-1_0-41.html#section-9

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::{
    ENTITY_CONFIGURATION_CONTENT_TYPE, ENTITY_CONFIGURATION_PATH, Entity, Error,
    FEDERATION_FETCH_ENDPOINT, FEDERATION_LIST_ENDPOINT, FEDERATION_RESOLVE_ENDPOINT, Result,
};

/// Port used when the entity identifier does not specify one.
const DEFAULT_PORT: u16 = 443;

/// Routes for an entity's federation endpoints.
pub fn router(entity: Arc<Entity>) -> Router {
    Router::new()
        .route(ENTITY_CONFIGURATION_PATH, any(entity_configuration))
        .route(FEDERATION_FETCH_ENDPOINT, any(not_implemented))
        .route(FEDERATION_LIST_ENDPOINT, any(not_implemented))
        .route(FEDERATION_RESOLVE_ENDPOINT, any(not_implemented))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(entity)
}

// Entity Configuration endpoint: GET only, HEAD is refused as well
#[allow(clippy::unused_async)]
async fn entity_configuration(
    method: Method, State(entity): State<Arc<Entity>>,
) -> Result<Response> {
    if method != Method::GET {
        return Ok((StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET")]).into_response());
    }
    let compact = entity
        .entity_configuration()?
        .encode()
        .map_err(|e| Error::Signing(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, ENTITY_CONFIGURATION_CONTENT_TYPE)], compact).into_response())
}

// Fetch, list and resolve endpoints
#[allow(clippy::unused_async)]
async fn not_implemented(uri: Uri) -> StatusCode {
    unimplemented!("{} is not implemented", uri.path())
}

/// A running set of federation endpoints.
///
/// Dropping the handle without calling [`ServingHandle::stop`] also shuts the
/// endpoints down, but without waiting for them to finish.
#[derive(Debug)]
pub struct ServingHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ServingHandle {
    /// The address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait until in-flight requests complete
    /// and the listener is closed.
    pub async fn stop(self) {
        let Self {
            local_addr,
            shutdown,
            task,
        } = self;

        // the task may already have exited
        let _ = shutdown.send(());
        if let Err(e) = task.await {
            tracing::error!(%local_addr, "federation endpoints task failed: {e}");
        }
        tracing::info!(%local_addr, "stopped serving federation endpoints");
    }
}

impl Entity {
    /// Serve the entity's federation endpoints on all interfaces, using the
    /// port in the entity's identifier (443 if it has none).
    ///
    /// Requests are served over plain HTTP. TLS for the `https` identifier is
    /// expected to be terminated in front of the listener.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serve`] if the listener cannot be bound.
    pub async fn serve(self: Arc<Self>) -> Result<ServingHandle> {
        let port = self.identifier().port().unwrap_or(DEFAULT_PORT);
        self.serve_at(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await
    }

    /// Serve the entity's federation endpoints on `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serve`] if the listener cannot be bound.
    pub async fn serve_at(self: Arc<Self>, addr: SocketAddr) -> Result<ServingHandle> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(
            %local_addr,
            identifier = %self.identifier(),
            "serving federation endpoints"
        );

        let (shutdown, signal) = oneshot::channel::<()>();
        let app = router(self);
        let task = tokio::spawn(async move {
            let signal = async {
                let _ = signal.await;
            };
            if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(signal).await {
                tracing::error!(%local_addr, "issue serving federation endpoints: {e}");
            }
        });

        Ok(ServingHandle {
            local_addr,
            shutdown,
            task,
        })
    }
}

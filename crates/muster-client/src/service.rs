use std::future::Future;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use muster_core::{Patch, Registration};
use tokio::net::TcpListener;

use crate::client::RegistryClient;
use crate::error::ClientError;
use crate::providers::Providers;

/// Routes every registered service exposes to the registry: the patch
/// webhook at `/services` and the liveness probe at `/heartbeat`.
pub fn client_routes(providers: Providers) -> Router {
    Router::new()
        .route("/services", post(apply_patch))
        .route("/heartbeat", get(heartbeat))
        .with_state(providers)
}

async fn apply_patch(State(providers): State<Providers>, Json(patch): Json<Patch>) -> StatusCode {
    providers.apply(&patch);
    StatusCode::OK
}

async fn heartbeat() -> StatusCode {
    StatusCode::OK
}

/// Serves `router` on `listener`, registers `registration`, and deregisters
/// once `shutdown` resolves and the server has drained.
///
/// The server is up before registering so the registry's bootstrap patch has
/// somewhere to land.
pub async fn run_service<F>(
    listener: TcpListener,
    router: Router,
    registration: Registration,
    client: RegistryClient,
    shutdown: F,
) -> Result<(), ClientError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
    });
    tracing::info!(service = %registration.service_name, %addr, "service listening");

    if let Err(e) = client.register(&registration).await {
        server.abort();
        return Err(e);
    }

    let served = server
        .await
        .map_err(|e| ClientError::Io(std::io::Error::other(e)))?;

    if let Err(e) = client.deregister(&registration.service_url).await {
        tracing::warn!(url = %registration.service_url, error = %e, "deregistration failed");
    }
    tracing::info!(service = %registration.service_name, "service stopped");
    served.map_err(ClientError::from)
}

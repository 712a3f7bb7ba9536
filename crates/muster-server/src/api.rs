use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use muster_core::{Registration, RegistryError, SERVICES_PATH};
use muster_registry::RegistrationStore;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RegistrationStore>,
}

#[derive(OpenApi)]
#[openapi(
    paths(register_service, deregister_service, list_services, health_check),
    components(schemas(
        muster_core::Registration,
        muster_core::Patch,
        muster_core::PatchEntry,
        muster_core::HealthStatus
    ))
)]
pub struct ApiDoc;

/// Registry routes. `/services` dispatches on the HTTP verb; anything other
/// than GET, POST, or DELETE gets 405.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            SERVICES_PATH,
            get(list_services)
                .post(register_service)
                .delete(deregister_service),
        )
        .route("/health", get(health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .with_state(state)
}

pub struct ApiError(RegistryError);

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            RegistryError::AlreadyExists(_) | RegistryError::Malformed(_) => StatusCode::BAD_REQUEST,
            RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, self.0.to_string()).into_response()
    }
}

#[utoipa::path(
    post,
    path = "/services",
    request_body = Registration,
    responses(
        (status = 200, description = "Service registered"),
        (status = 400, description = "Undecodable body, empty URL, or URL already registered")
    )
)]
async fn register_service(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let registration: Registration = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "rejecting undecodable registration");
        RegistryError::Malformed(e.to_string())
    })?;
    tracing::info!(
        service = %registration.service_name,
        url = %registration.service_url,
        "adding service"
    );

    state.store.add(registration).await.map_err(|e| {
        tracing::warn!(error = %e, "registration rejected");
        e
    })?;
    metrics::counter!("muster_registrations_total").increment(1);
    Ok(StatusCode::OK)
}

#[utoipa::path(
    delete,
    path = "/services",
    request_body(content = String, description = "serviceURL to remove", content_type = "text/plain"),
    responses(
        (status = 200, description = "Service removed"),
        (status = 400, description = "Empty body"),
        (status = 404, description = "No service registered at that URL")
    )
)]
async fn deregister_service(
    State(state): State<AppState>,
    body: String,
) -> Result<StatusCode, ApiError> {
    let url = body.trim();
    if url.is_empty() {
        return Err(RegistryError::Malformed("empty service URL".into()).into());
    }
    tracing::info!(url = %url, "removing service");

    state.store.remove(url).await.map_err(|e| {
        tracing::warn!(error = %e, "deregistration rejected");
        e
    })?;
    metrics::counter!("muster_deregistrations_total").increment(1);
    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/services",
    responses((status = 200, description = "Current registrations", body = Vec<Registration>))
)]
async fn list_services(State(state): State<AppState>) -> Json<Vec<Registration>> {
    Json(state.store.snapshot().await)
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "OK"))
)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

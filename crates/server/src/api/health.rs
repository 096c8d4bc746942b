//! Liveness endpoint.

use crate::AppResources;
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const MISC_TAG: &str = "Miscellaneous";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    /// Stored sessions, including expired ones not yet evicted
    pub sessions: usize,
    pub pending_logins: usize,
}

pub fn router(resources: AppResources) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(health))
        .with_state(resources)
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/healthz",
    tag = MISC_TAG,
    operation_id = "Health Check",
    summary = "Liveness and in-memory store sizes",
    responses(
        (status = 200, description = "Service is accepting requests", body = HealthResponse)
    )
)]
async fn health(State(resources): State<AppResources>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        sessions: resources.sessions.len(),
        pending_logins: resources.states.len(),
    })
}

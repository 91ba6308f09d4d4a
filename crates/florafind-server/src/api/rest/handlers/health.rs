//! Health and welcome handlers

use super::MessageResponse;
use crate::api::rest::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
}

/// Root welcome endpoint
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("Welcome to FloraFind API"))
}

/// Health check endpoint; 503 when storage is unreachable
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthCheckResponse>) {
    let (status, label) = match state.storage.ping().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            tracing::warn!(error = %e, "Storage health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    (
        status,
        Json(HealthCheckResponse {
            status: label.to_string(),
            version: state.version.clone(),
            uptime: state.uptime(),
        }),
    )
}

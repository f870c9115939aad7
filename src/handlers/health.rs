use std::sync::Arc;
use axum::{extract::State, http::StatusCode, Json};
use tracing::{debug, warn};

use crate::AppState;
use crate::models::HealthResponse;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
    })
}

/// Readiness check endpoint. Ready once the upload directory is usable.
pub async fn ready_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    debug!("Readiness check requested");
    match tokio::fs::metadata(&state.config.upload_dir).await {
        Ok(meta) if meta.is_dir() => (StatusCode::OK, Json(HealthResponse {
            status: "ok".to_string(),
            message: "Service is ready".to_string(),
        })),
        _ => {
            warn!("Upload directory {} is missing", state.config.upload_dir);
            (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse {
                status: "unavailable".to_string(),
                message: format!("Upload directory {} is missing", state.config.upload_dir),
            }))
        }
    }
}

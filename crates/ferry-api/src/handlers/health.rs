use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub storage: String,
    pub upload_sessions: usize,
    pub artifacts: usize,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(5);

    let mut response = HealthCheckResponse {
        status: "healthy".to_string(),
        storage: "unknown".to_string(),
        upload_sessions: state.uploads.store.len().await,
        artifacts: state.uploads.catalog.len().await,
    };

    // Lookup of a key that never exists; proves the backend answers without writing.
    match tokio::time::timeout(
        TIMEOUT,
        state.uploads.storage.exists("health-check-non-existent-key"),
    )
    .await
    {
        Ok(Ok(_)) => {
            response.storage = "healthy".to_string();
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Storage health check failed");
            response.storage = format!("unhealthy: {}", e);
            response.status = "unhealthy".to_string();
        }
        Err(_) => {
            tracing::error!("Storage health check timed out");
            response.storage = "timeout".to_string();
            response.status = "unhealthy".to_string();
        }
    }

    let status_code = if response.status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

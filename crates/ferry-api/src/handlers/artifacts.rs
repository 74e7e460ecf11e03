use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
    response::IntoResponse,
};
use ferry_core::validation::sanitize_file_name;
use ferry_core::{AppError, Artifact};
use futures::StreamExt;
use std::sync::Arc;

#[tracing::instrument(
    skip(state),
    fields(public_reference = %public_reference, operation = "download_artifact")
)]
pub async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path(public_reference): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let artifact = state
        .uploads
        .catalog
        .get_by_reference(&public_reference)
        .await
        .ok_or_else(|| AppError::NotFound("Artifact not found".to_string()))?;

    stream_artifact(&state, &artifact).await
}

/// Proxy an artifact's bytes from storage with its stored content type.
pub(crate) async fn stream_artifact(
    state: &AppState,
    artifact: &Artifact,
) -> Result<Response<Body>, HttpAppError> {
    tracing::debug!(
        artifact_id = %artifact.id,
        storage_key = %artifact.storage_key,
        "Proxying artifact from storage"
    );

    let stream = state
        .uploads
        .storage
        .download_stream(&artifact.storage_key)
        .await?;

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    let content_disposition = format!(
        "inline; filename=\"{}\"",
        sanitize_file_name(&artifact.original_file_name).replace('"', "")
    );

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, artifact.content_type.as_str())
        .header(header::CONTENT_LENGTH, artifact.size_bytes)
        .header(header::CONTENT_DISPOSITION, content_disposition.as_str())
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

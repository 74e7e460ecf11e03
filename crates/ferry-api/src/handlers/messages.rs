use super::artifacts::stream_artifact;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use ferry_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Bytes of the artifact a room message points at.
///
/// A message that exists but carries no attachment is a 404 with `NO_ATTACHMENT`, never
/// an empty or placeholder body.
#[tracing::instrument(skip(state), fields(message_id = %message_id, operation = "download_attachment"))]
pub async fn download_attachment(
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let message = state
        .rooms
        .message(message_id)
        .await
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

    let attachment = message.attachment.ok_or_else(|| {
        AppError::NoAttachment(format!("Message {} has no attachment", message_id))
    })?;

    let artifact = state
        .uploads
        .catalog
        .get_by_reference(&attachment.public_reference)
        .await
        .ok_or_else(|| AppError::NotFound("Attached artifact not found".to_string()))?;

    stream_artifact(&state, &artifact).await
}

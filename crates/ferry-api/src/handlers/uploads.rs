use crate::error::HttpAppError;
use crate::identity::UploaderIdentity;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use ferry_core::{AppError, UploadSessionView};
use std::sync::Arc;
use uuid::Uuid;

/// Status of one of the caller's upload sessions.
///
/// Sessions of other uploaders are reported as missing.
pub async fn get_upload(
    State(state): State<Arc<AppState>>,
    UploaderIdentity(uploader_id): UploaderIdentity,
    Path(upload_id): Path<Uuid>,
) -> Result<Json<UploadSessionView>, HttpAppError> {
    let view = state
        .uploads
        .store
        .snapshot(upload_id)
        .await
        .filter(|view| view.uploader_id == uploader_id)
        .ok_or_else(|| AppError::NotFound(format!("Upload session {} not found", upload_id)))?;

    Ok(Json(view))
}

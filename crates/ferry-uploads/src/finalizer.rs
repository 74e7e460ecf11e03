//! Artifact finalization
//!
//! Turns the assembled bytes of a completing session into a durable artifact: size and
//! type reconciliation, key generation, the storage write and catalog registration.
//! Any failure leaves neither a stored object nor a catalog entry behind.

use crate::catalog::ArtifactCatalog;
use chrono::Utc;
use ferry_core::{Artifact, TypeTable, UploadError};
use ferry_storage::{generate_artifact_key, Storage};
use std::sync::Arc;
use uuid::Uuid;

/// Everything the finalizer needs, taken out of the session under its lock.
#[derive(Debug)]
pub struct FinalizeRequest {
    pub upload_id: Uuid,
    pub uploader_id: Uuid,
    pub room_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub total_size: u64,
    pub data: Vec<u8>,
}

pub struct ArtifactFinalizer {
    storage: Arc<dyn Storage>,
    type_table: TypeTable,
    catalog: Arc<ArtifactCatalog>,
}

impl ArtifactFinalizer {
    pub fn new(
        storage: Arc<dyn Storage>,
        type_table: TypeTable,
        catalog: Arc<ArtifactCatalog>,
    ) -> Self {
        Self {
            storage,
            type_table,
            catalog,
        }
    }

    pub fn catalog(&self) -> &Arc<ArtifactCatalog> {
        &self.catalog
    }

    #[tracing::instrument(
        skip(self, request),
        fields(upload_id = %request.upload_id, size_bytes = request.data.len())
    )]
    pub async fn finalize(&self, request: FinalizeRequest) -> Result<Artifact, UploadError> {
        let FinalizeRequest {
            upload_id,
            uploader_id,
            room_id,
            file_name,
            content_type,
            total_size,
            data,
        } = request;

        let size_bytes = data.len() as u64;
        if size_bytes != total_size {
            return Err(UploadError::invalid_chunk(format!(
                "upload {} assembled {} bytes but {} were declared",
                upload_id, size_bytes, total_size
            )));
        }

        let reconciled = self.type_table.reconcile(&content_type, &file_name)?;

        let now = Utc::now();
        let storage_key = generate_artifact_key(reconciled.category, &file_name, now);

        if let Err(e) = self
            .storage
            .put(&storage_key, data, &reconciled.content_type)
            .await
        {
            tracing::error!(
                error = %e,
                storage_key = %storage_key,
                "Failed to store artifact, removing any residue"
            );
            if let Err(cleanup) = self.storage.delete(&storage_key).await {
                tracing::warn!(
                    error = %cleanup,
                    storage_key = %storage_key,
                    "Failed to remove partial artifact"
                );
            }
            return Err(UploadError::storage_write_failed(e.to_string()));
        }

        let id = Uuid::new_v4();
        let artifact = Artifact {
            id,
            public_reference: Artifact::public_reference_for(id),
            storage_key,
            category: reconciled.category,
            size_bytes,
            content_type: reconciled.content_type,
            original_file_name: file_name,
            uploader_id,
            room_id,
            created_at: now,
        };

        self.catalog.insert(artifact.clone()).await;

        tracing::info!(
            upload_id = %upload_id,
            artifact_id = %artifact.id,
            public_reference = %artifact.public_reference,
            storage_key = %artifact.storage_key,
            category = %artifact.category,
            content_type = %artifact.content_type,
            signal = ?reconciled.signal,
            "Artifact finalized"
        );

        Ok(artifact)
    }
}

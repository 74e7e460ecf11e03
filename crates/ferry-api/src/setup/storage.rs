//! Storage setup and initialization

use anyhow::Result;
use ferry_core::FerryConfig;
use ferry_storage::{LocalStorage, Storage};
use std::sync::Arc;

pub async fn setup_storage(config: &FerryConfig) -> Result<Arc<dyn Storage>> {
    tracing::info!(
        root = %config.storage_root().display(),
        "Initializing local artifact storage..."
    );
    let storage = LocalStorage::new(config.storage_root()).await?;
    tracing::info!("Artifact storage initialized successfully");

    Ok(Arc::new(storage))
}

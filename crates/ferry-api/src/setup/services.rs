//! Upload core wiring and background tasks

use crate::rooms::RoomNotifier;
use crate::state::{AppState, UploadState};
use ferry_core::FerryConfig;
use ferry_storage::Storage;
use ferry_uploads::{
    ArtifactCatalog, ArtifactFinalizer, ChunkAssembler, SessionReaper, UploadSessionStore,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Build the upload core around a storage backend and a room collaborator.
pub fn initialize_services(
    config: &FerryConfig,
    storage: Arc<dyn Storage>,
    rooms: Arc<dyn RoomNotifier>,
) -> Arc<AppState> {
    let store = Arc::new(UploadSessionStore::with_session_limit(
        config.max_open_sessions_per_uploader(),
    ));
    let catalog = Arc::new(ArtifactCatalog::new());

    let finalizer = Arc::new(ArtifactFinalizer::new(
        storage.clone(),
        config.type_table().clone(),
        catalog.clone(),
    ));
    let assembler = Arc::new(ChunkAssembler::new(
        store.clone(),
        finalizer,
        config.upload_limits(),
    ));
    let reaper = Arc::new(SessionReaper::from_config(store.clone(), config));

    tracing::info!(
        max_artifact_size = config.upload_limits().max_artifact_size,
        max_chunk_count = config.upload_limits().max_chunk_count,
        idle_timeout_secs = config.idle_timeout().as_secs(),
        max_lifetime_secs = config.max_session_lifetime().as_secs(),
        "Upload services initialized"
    );

    Arc::new(AppState {
        config: config.clone(),
        uploads: UploadState {
            store,
            assembler,
            catalog,
            reaper,
            storage,
        },
        rooms,
    })
}

/// Start the session reaper.
/// Returns a JoinHandle for graceful shutdown
pub fn start_background_tasks(state: &AppState) -> JoinHandle<()> {
    tracing::info!(
        interval_secs = state.config.reaper_interval().as_secs(),
        "Starting upload session reaper"
    );
    state.uploads.reaper.clone().start()
}

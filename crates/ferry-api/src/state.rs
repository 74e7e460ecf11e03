//! Application state shared by the gateway and the HTTP handlers.

use crate::rooms::RoomNotifier;
use ferry_core::FerryConfig;
use ferry_storage::Storage;
use ferry_uploads::{ArtifactCatalog, ChunkAssembler, SessionReaper, UploadSessionStore};
use std::sync::Arc;

/// The upload core: session arena, assembler, finalized artifacts and their bytes.
#[derive(Clone)]
pub struct UploadState {
    pub store: Arc<UploadSessionStore>,
    pub assembler: Arc<ChunkAssembler>,
    pub catalog: Arc<ArtifactCatalog>,
    pub reaper: Arc<SessionReaper>,
    pub storage: Arc<dyn Storage>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: FerryConfig,
    pub uploads: UploadState,
    pub rooms: Arc<dyn RoomNotifier>,
}

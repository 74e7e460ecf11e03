//! Index of finalized artifacts by public reference.

use ferry_core::Artifact;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory artifact catalog.
///
/// Only the finalizer inserts, and only after the bytes are durably stored, so every
/// reference found here points at a readable object.
#[derive(Default)]
pub struct ArtifactCatalog {
    artifacts: RwLock<HashMap<Uuid, Artifact>>,
}

impl ArtifactCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, artifact: Artifact) {
        self.artifacts.write().await.insert(artifact.id, artifact);
    }

    pub async fn get(&self, id: Uuid) -> Option<Artifact> {
        self.artifacts.read().await.get(&id).cloned()
    }

    pub async fn get_by_reference(&self, public_reference: &str) -> Option<Artifact> {
        let id = Artifact::parse_public_reference(public_reference)?;
        self.get(id).await
    }

    pub async fn len(&self) -> usize {
        self.artifacts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.artifacts.read().await.is_empty()
    }
}

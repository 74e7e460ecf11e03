use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

const PUBLIC_REFERENCE_PREFIX: &str = "art_";

/// Category directory an artifact is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Images,
    Documents,
    Video,
    Other,
}

impl MediaCategory {
    pub const ALL: [MediaCategory; 4] = [
        MediaCategory::Images,
        MediaCategory::Documents,
        MediaCategory::Video,
        MediaCategory::Other,
    ];

    /// Directory name under the upload root.
    pub fn as_dir(&self) -> &'static str {
        match self {
            MediaCategory::Images => "images",
            MediaCategory::Documents => "documents",
            MediaCategory::Video => "video",
            MediaCategory::Other => "other",
        }
    }
}

impl FromStr for MediaCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "images" | "image" => Ok(MediaCategory::Images),
            "documents" | "document" => Ok(MediaCategory::Documents),
            "video" | "videos" => Ok(MediaCategory::Video),
            "other" => Ok(MediaCategory::Other),
            _ => Err(anyhow::anyhow!("Invalid media category: {}", s)),
        }
    }
}

impl Display for MediaCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_dir())
    }
}

/// The durable result of a completed upload. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: Uuid,
    /// Identifier handed to clients and the room collaborator for later retrieval
    pub public_reference: String,
    /// Category-scoped key inside the storage backend
    pub storage_key: String,
    pub category: MediaCategory,
    pub size_bytes: u64,
    /// Reconciled content type, not necessarily the one the client declared
    pub content_type: String,
    pub original_file_name: String,
    pub uploader_id: Uuid,
    pub room_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Public reference for an artifact id: `art_` followed by the hyphenless id.
    pub fn public_reference_for(id: Uuid) -> String {
        format!("{}{}", PUBLIC_REFERENCE_PREFIX, id.simple())
    }

    /// Inverse of [`Artifact::public_reference_for`].
    pub fn parse_public_reference(reference: &str) -> Option<Uuid> {
        reference
            .strip_prefix(PUBLIC_REFERENCE_PREFIX)
            .and_then(|raw| Uuid::try_parse(raw).ok())
    }
}

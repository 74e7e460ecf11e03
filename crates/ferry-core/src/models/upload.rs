use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

/// Lifecycle state of an upload session.
///
/// `Open -> Completing -> Completed | Failed`, `Open -> Failed | Expired`.
/// `Completed`, `Failed` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Open,
    Completing,
    Completed,
    Failed,
    Expired,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Expired
        )
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SessionState::Open => write!(f, "open"),
            SessionState::Completing => write!(f, "completing"),
            SessionState::Completed => write!(f, "completed"),
            SessionState::Failed => write!(f, "failed"),
            SessionState::Expired => write!(f, "expired"),
        }
    }
}

/// Byte progress of an upload, reported after every accepted chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub upload_id: Uuid,
    pub bytes_received: u64,
    pub total_size: u64,
}

impl UploadProgress {
    pub fn percent(&self) -> f64 {
        if self.total_size > 0 {
            (self.bytes_received as f64 / self.total_size as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Read-only snapshot of an upload session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSessionView {
    pub upload_id: Uuid,
    pub uploader_id: Uuid,
    pub room_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub total_size: u64,
    pub total_chunks: u32,
    pub chunk_size: u64,
    pub chunks_received: u32,
    pub bytes_received: u64,
    /// Upload progress percentage (0-100)
    pub progress_percent: f64,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

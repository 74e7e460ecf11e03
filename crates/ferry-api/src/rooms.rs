//! Room collaborator boundary.
//!
//! Chat rooms and message persistence live outside this service. The gateway only needs
//! to post plain messages, announce finished artifacts so the room can show a message
//! with an attachment pointer, and resolve a message's attachment for retrieval.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ferry_core::{AppError, Artifact};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

const FEED_CAPACITY: usize = 256;

/// Pointer from a message to the artifact it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentPointer {
    pub public_reference: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub file_name: String,
}

impl From<&Artifact> for AttachmentPointer {
    fn from(artifact: &Artifact) -> Self {
        Self {
            public_reference: artifact.public_reference.clone(),
            content_type: artifact.content_type.clone(),
            size_bytes: artifact.size_bytes,
            file_name: artifact.original_file_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessage {
    pub id: Uuid,
    pub room_id: Uuid,
    pub author_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentPointer>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait RoomNotifier: Send + Sync {
    /// Post a text message to a room.
    async fn post_message(
        &self,
        room_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> Result<RoomMessage, AppError>;

    /// Announce a finished artifact; the room turns it into a message with an attachment.
    async fn artifact_posted(&self, artifact: &Artifact) -> Result<RoomMessage, AppError>;

    async fn message(&self, message_id: Uuid) -> Option<RoomMessage>;
}

/// Process-local room log with a broadcast feed of every posted message.
pub struct InMemoryRoomLog {
    messages: RwLock<HashMap<Uuid, RoomMessage>>,
    feed: broadcast::Sender<RoomMessage>,
}

impl Default for InMemoryRoomLog {
    fn default() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            messages: RwLock::new(HashMap::new()),
            feed,
        }
    }
}

impl InMemoryRoomLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomMessage> {
        self.feed.subscribe()
    }

    pub async fn messages_in(&self, room_id: Uuid) -> Vec<RoomMessage> {
        let mut messages: Vec<RoomMessage> = self
            .messages
            .read()
            .await
            .values()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        messages
    }

    async fn record(&self, message: RoomMessage) -> RoomMessage {
        self.messages
            .write()
            .await
            .insert(message.id, message.clone());
        // No subscribers is fine
        let _ = self.feed.send(message.clone());
        message
    }
}

#[async_trait]
impl RoomNotifier for InMemoryRoomLog {
    async fn post_message(
        &self,
        room_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> Result<RoomMessage, AppError> {
        let message = RoomMessage {
            id: Uuid::new_v4(),
            room_id,
            author_id,
            content: Some(content),
            attachment: None,
            created_at: Utc::now(),
        };
        Ok(self.record(message).await)
    }

    async fn artifact_posted(&self, artifact: &Artifact) -> Result<RoomMessage, AppError> {
        let message = RoomMessage {
            id: Uuid::new_v4(),
            room_id: artifact.room_id,
            author_id: artifact.uploader_id,
            content: None,
            attachment: Some(AttachmentPointer::from(artifact)),
            created_at: Utc::now(),
        };
        tracing::info!(
            message_id = %message.id,
            room_id = %message.room_id,
            public_reference = %artifact.public_reference,
            "Artifact posted to room"
        );
        Ok(self.record(message).await)
    }

    async fn message(&self, message_id: Uuid) -> Option<RoomMessage> {
        self.messages.read().await.get(&message_id).cloned()
    }
}

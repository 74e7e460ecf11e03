//! Wire frames exchanged over the upload WebSocket.
//!
//! Every frame is a JSON object tagged by `type` with camelCase fields. Chunk payloads
//! travel base64 encoded.

use ferry_core::constants::API_PREFIX;
use ferry_core::{UploadError, UploadErrorKind, UploadProgress};
use ferry_uploads::{BeginUpload, UploadEvent};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundFrame {
    Begin(BeginFrame),
    Chunk(ChunkFrame),
    Cancel(CancelFrame),
    Message(MessageFrame),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginFrame {
    pub file_name: String,
    pub content_type: String,
    pub total_size: u64,
    pub total_chunks: u64,
    #[serde(default)]
    pub chunk_size: Option<u64>,
}

impl From<BeginFrame> for BeginUpload {
    fn from(frame: BeginFrame) -> Self {
        BeginUpload {
            file_name: frame.file_name,
            content_type: frame.content_type,
            total_size: frame.total_size,
            total_chunks: frame.total_chunks,
            chunk_size: frame.chunk_size,
        }
    }
}

/// One chunk of an upload.
///
/// Without `uploadId` the frame opens a new session, so it must carry the whole
/// declaration. With one, the declaration fields are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkFrame {
    #[serde(default)]
    pub upload_id: Option<Uuid>,
    pub sequence_number: i64,
    #[serde(default)]
    pub total_chunks: Option<u64>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub total_size: Option<u64>,
    #[serde(default)]
    pub chunk_size: Option<u64>,
    pub payload: String,
}

impl ChunkFrame {
    /// The declaration carried by a chunk that opens its own session.
    pub fn implicit_begin(&self) -> Result<BeginUpload, UploadError> {
        match (
            &self.file_name,
            &self.content_type,
            self.total_size,
            self.total_chunks,
        ) {
            (Some(file_name), Some(content_type), Some(total_size), Some(total_chunks)) => {
                Ok(BeginUpload {
                    file_name: file_name.clone(),
                    content_type: content_type.clone(),
                    total_size,
                    total_chunks,
                    chunk_size: self.chunk_size,
                })
            }
            _ => Err(UploadError::invalid_chunk(
                "a chunk without uploadId must declare fileName, contentType, totalSize and totalChunks",
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelFrame {
    pub upload_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageFrame {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OutboundFrame {
    Started {
        upload_id: Uuid,
        chunk_size: u64,
        total_chunks: u32,
    },
    Progress {
        upload_id: Uuid,
        bytes_received: u64,
        total_size: u64,
    },
    Completed {
        upload_id: Uuid,
        public_reference: String,
        content_type: String,
        size_bytes: u64,
        file_name: String,
        url: String,
    },
    Failed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        upload_id: Option<Uuid>,
        error_kind: UploadErrorKind,
        message: String,
    },
    Cancelled {
        upload_id: Uuid,
    },
    MessageAccepted {
        message_id: Uuid,
    },
}

impl OutboundFrame {
    pub fn progress(progress: UploadProgress) -> Self {
        OutboundFrame::Progress {
            upload_id: progress.upload_id,
            bytes_received: progress.bytes_received,
            total_size: progress.total_size,
        }
    }

    pub fn failed(upload_id: Option<Uuid>, error: &UploadError) -> Self {
        OutboundFrame::Failed {
            upload_id,
            error_kind: error.kind,
            message: error.message.clone(),
        }
    }

    /// Render a session event. `public_base_url` prefixes the retrieval URL of a
    /// completed artifact.
    pub fn from_event(event: UploadEvent, public_base_url: &str) -> Self {
        match event {
            UploadEvent::Started {
                upload_id,
                chunk_size,
                total_chunks,
            } => OutboundFrame::Started {
                upload_id,
                chunk_size,
                total_chunks,
            },
            UploadEvent::Progress(progress) => OutboundFrame::progress(progress),
            UploadEvent::Completed {
                upload_id,
                artifact,
            } => OutboundFrame::Completed {
                upload_id,
                url: format!(
                    "{}{}/artifacts/{}",
                    public_base_url.trim_end_matches('/'),
                    API_PREFIX,
                    artifact.public_reference
                ),
                public_reference: artifact.public_reference,
                content_type: artifact.content_type,
                size_bytes: artifact.size_bytes,
                file_name: artifact.original_file_name,
            },
            UploadEvent::Failed { upload_id, error } => {
                OutboundFrame::failed(Some(upload_id), &error)
            }
            UploadEvent::Expired { upload_id } => {
                OutboundFrame::failed(Some(upload_id), &UploadError::session_expired(upload_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chunk_frame_with_declaration() {
        let frame: InboundFrame = serde_json::from_value(json!({
            "type": "chunk",
            "sequenceNumber": 0,
            "totalChunks": 3,
            "fileName": "report.pdf",
            "contentType": "application/pdf",
            "totalSize": 300,
            "payload": "AAAA"
        }))
        .unwrap();

        let InboundFrame::Chunk(chunk) = frame else {
            panic!("expected a chunk frame");
        };
        assert!(chunk.upload_id.is_none());
        let begin = chunk.implicit_begin().unwrap();
        assert_eq!(begin.total_chunks, 3);
        assert_eq!(begin.chunk_size, None);
    }

    #[test]
    fn test_implicit_begin_requires_declaration() {
        let frame: InboundFrame = serde_json::from_value(json!({
            "type": "chunk",
            "sequenceNumber": 0,
            "payload": "AAAA"
        }))
        .unwrap();

        let InboundFrame::Chunk(chunk) = frame else {
            panic!("expected a chunk frame");
        };
        let err = chunk.implicit_begin().unwrap_err();
        assert_eq!(err.kind, UploadErrorKind::InvalidChunk);
    }

    #[test]
    fn test_unknown_frame_type_rejected() {
        let parsed = serde_json::from_value::<InboundFrame>(json!({"type": "resume"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_failed_frame_shape() {
        let frame = OutboundFrame::failed(None, &UploadError::misused_transport());
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "failed");
        assert_eq!(value["errorKind"], "MISUSED_TRANSPORT");
        assert!(value.get("uploadId").is_none());
    }

    #[test]
    fn test_expired_event_reported_as_failure() {
        let upload_id = Uuid::new_v4();
        let frame = OutboundFrame::from_event(UploadEvent::Expired { upload_id }, "http://x");
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["errorKind"], "SESSION_EXPIRED");
        assert_eq!(value["uploadId"], upload_id.to_string());
    }
}

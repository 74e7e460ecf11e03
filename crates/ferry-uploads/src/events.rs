//! Upload events delivered back to whoever drives a session.

use ferry_core::{Artifact, UploadError, UploadProgress};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum UploadEvent {
    Started {
        upload_id: Uuid,
        chunk_size: u64,
        total_chunks: u32,
    },
    Progress(UploadProgress),
    Completed {
        upload_id: Uuid,
        artifact: Artifact,
    },
    Failed {
        upload_id: Uuid,
        error: UploadError,
    },
    Expired {
        upload_id: Uuid,
    },
}

impl UploadEvent {
    pub fn upload_id(&self) -> Uuid {
        match self {
            UploadEvent::Started { upload_id, .. }
            | UploadEvent::Completed { upload_id, .. }
            | UploadEvent::Failed { upload_id, .. }
            | UploadEvent::Expired { upload_id } => *upload_id,
            UploadEvent::Progress(progress) => progress.upload_id,
        }
    }
}

/// Sending half of a connection's event channel, captured by each session it creates.
///
/// Progress is dropped when the channel is full and terminal events fall back to a
/// spawned send. Only `Started` is sent with an awaited send, so it always precedes
/// the progress of its session.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<UploadEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<UploadEvent>) -> Self {
        Self { tx }
    }

    /// Create a bounded channel and the sink feeding it.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<UploadEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Best-effort progress delivery.
    pub fn progress(&self, progress: UploadProgress) {
        match self.tx.try_send(UploadEvent::Progress(progress)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::trace!(upload_id = %progress.upload_id, "Event channel full, progress dropped");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Deliver an event that must not be lost while the receiver is alive.
    pub fn deliver(&self, event: UploadEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(event).await;
                });
            }
            Err(TrySendError::Closed(event)) => {
                tracing::debug!(
                    upload_id = %event.upload_id(),
                    "Event receiver gone, dropping upload event"
                );
            }
        }
    }

    /// Enqueue an event, waiting for room in the channel.
    pub async fn send(&self, event: UploadEvent) {
        if let Err(e) = self.tx.send(event).await {
            tracing::debug!(
                upload_id = %e.0.upload_id(),
                "Event receiver gone, dropping upload event"
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

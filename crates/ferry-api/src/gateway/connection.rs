//! Per-connection loop of the upload gateway.

use super::frames::{ChunkFrame, InboundFrame, OutboundFrame};
use super::misuse::looks_like_storage_path;
use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket};
use base64::{engine::general_purpose::STANDARD, Engine};
use ferry_core::UploadError;
use ferry_uploads::{AssemblyOutcome, BeginUpload, EventSink};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

/// Everything a frame handler needs, shared by the tasks spawned for one connection.
struct ConnectionContext {
    state: Arc<AppState>,
    room_id: Uuid,
    uploader_id: Uuid,
    events: EventSink,
    replies: mpsc::Sender<OutboundFrame>,
}

impl ConnectionContext {
    async fn reply(&self, frame: OutboundFrame) {
        // The writer is gone only when the connection is closing.
        let _ = self.replies.send(frame).await;
    }

    async fn reject(&self, upload_id: Option<Uuid>, error: UploadError) {
        tracing::debug!(
            upload_id = ?upload_id,
            error_kind = %error.kind,
            message = %error.message,
            "Frame rejected"
        );
        self.reply(OutboundFrame::failed(upload_id, &error)).await;
    }
}

/// Drive one WebSocket connection until the client goes away.
///
/// Session events and direct replies both funnel into a single writer task, the only
/// place that writes to the socket.
pub async fn run(socket: WebSocket, state: Arc<AppState>, room_id: Uuid, uploader_id: Uuid) {
    let capacity = state.config.event_channel_capacity();
    let inflight = Arc::new(Semaphore::new(state.config.max_inflight_chunks()));
    let public_base_url = state.config.public_base_url().to_string();

    let (mut sender, mut receiver) = socket.split();
    let (events, mut event_rx) = EventSink::channel(capacity);
    let (replies, mut reply_rx) = mpsc::channel::<OutboundFrame>(capacity);

    let writer = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                Some(event) = event_rx.recv() => OutboundFrame::from_event(event, &public_base_url),
                Some(frame) = reply_rx.recv() => frame,
                else => break,
            };

            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize outbound frame");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let ctx = Arc::new(ConnectionContext {
        state,
        room_id,
        uploader_id,
        events,
        replies,
    });

    tracing::info!(room_id = %room_id, uploader_id = %uploader_id, "Upload connection opened");

    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                ctx.reject(
                    None,
                    UploadError::invalid_chunk("binary frames are not supported; send JSON text"),
                )
                .await;
                continue;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let frame = match serde_json::from_str::<InboundFrame>(text.as_str()) {
            Ok(frame) => frame,
            Err(e) => {
                ctx.reject(None, UploadError::invalid_chunk(format!("malformed frame: {}", e)))
                    .await;
                continue;
            }
        };

        match frame {
            InboundFrame::Chunk(chunk) => {
                // Stop reading while the connection already has its share of chunks in flight.
                let Ok(permit) = inflight.clone().acquire_owned().await else {
                    break;
                };
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    handle_chunk(&ctx, chunk).await;
                    drop(permit);
                });
            }
            InboundFrame::Begin(begin) => handle_begin(&ctx, begin.into()).await,
            InboundFrame::Cancel(cancel) => handle_cancel(&ctx, cancel.upload_id).await,
            InboundFrame::Message(message) => handle_message(&ctx, message.content).await,
        }
    }

    let open = ctx
        .state
        .uploads
        .store
        .open_sessions_for(uploader_id)
        .await
        .len();
    tracing::info!(
        room_id = %room_id,
        uploader_id = %uploader_id,
        open_sessions = open,
        "Upload connection closed; open sessions left to expire"
    );
    writer.abort();
}

async fn handle_begin(ctx: &ConnectionContext, begin: BeginUpload) {
    // The started frame comes through the session's event sink.
    if let Err(e) = ctx
        .state
        .uploads
        .assembler
        .begin(ctx.uploader_id, ctx.room_id, begin, ctx.events.clone())
        .await
    {
        ctx.reject(None, e).await;
    }
}

async fn handle_chunk(ctx: &ConnectionContext, chunk: ChunkFrame) {
    let payload = match STANDARD.decode(chunk.payload.as_bytes()) {
        Ok(payload) => payload,
        Err(e) => {
            ctx.reject(
                chunk.upload_id,
                UploadError::invalid_chunk(format!("payload is not valid base64: {}", e)),
            )
            .await;
            return;
        }
    };

    let assembler = &ctx.state.uploads.assembler;

    let upload_id = match chunk.upload_id {
        Some(upload_id) => upload_id,
        None => {
            let begin = match chunk.implicit_begin() {
                Ok(begin) => begin,
                Err(e) => return ctx.reject(None, e).await,
            };
            match assembler
                .begin(ctx.uploader_id, ctx.room_id, begin, ctx.events.clone())
                .await
            {
                Ok((upload_id, _)) => upload_id,
                Err(e) => return ctx.reject(None, e).await,
            }
        }
    };

    match assembler
        .accept(upload_id, ctx.uploader_id, chunk.sequence_number, &payload)
        .await
    {
        Ok(AssemblyOutcome::Completed(artifact)) => {
            if let Err(e) = ctx.state.rooms.artifact_posted(&artifact).await {
                tracing::error!(
                    upload_id = %upload_id,
                    public_reference = %artifact.public_reference,
                    error = %e,
                    "Failed to announce artifact to room"
                );
            }
        }
        Ok(AssemblyOutcome::DuplicateIgnored(progress)) => {
            ctx.reply(OutboundFrame::progress(progress)).await
        }
        // Accepted progress and rejections were already reported through the session's sink.
        Ok(_) => {}
        Err(e) => ctx.reject(Some(upload_id), e).await,
    }
}

async fn handle_cancel(ctx: &ConnectionContext, upload_id: Uuid) {
    match ctx
        .state
        .uploads
        .store
        .cancel(upload_id, ctx.uploader_id)
        .await
    {
        Ok(_) => ctx.reply(OutboundFrame::Cancelled { upload_id }).await,
        Err(e) => ctx.reject(Some(upload_id), e).await,
    }
}

async fn handle_message(ctx: &ConnectionContext, content: String) {
    if looks_like_storage_path(&content) {
        tracing::warn!(
            room_id = %ctx.room_id,
            uploader_id = %ctx.uploader_id,
            error_kind = "MISUSED_TRANSPORT",
            "Message content looks like a storage path"
        );
        ctx.reply(OutboundFrame::failed(None, &UploadError::misused_transport()))
            .await;
        return;
    }

    match ctx
        .state
        .rooms
        .post_message(ctx.room_id, ctx.uploader_id, content)
        .await
    {
        Ok(message) => {
            ctx.reply(OutboundFrame::MessageAccepted {
                message_id: message.id,
            })
            .await
        }
        Err(e) => {
            tracing::error!(room_id = %ctx.room_id, error = %e, "Failed to post message");
        }
    }
}

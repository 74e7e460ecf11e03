//! WebSocket upload gateway.
//!
//! One connection per uploader and room. Frames are JSON tagged by `type`.
//!
//! ## Protocol
//!
//! ### Client → Server
//!
//! ```json
//! {"type":"begin","fileName":"report.pdf","contentType":"application/pdf","totalSize":300,"totalChunks":3}
//! {"type":"chunk","uploadId":"…","sequenceNumber":0,"payload":"<base64>"}
//! {"type":"chunk","sequenceNumber":0,"fileName":"a.png","contentType":"image/png","totalSize":10,"totalChunks":1,"payload":"<base64>"}
//! {"type":"cancel","uploadId":"…"}
//! {"type":"message","content":"hello"}
//! ```
//!
//! Sequence numbers start at 0. A chunk without `uploadId` opens a new upload.
//!
//! ### Server → Client
//!
//! ```json
//! {"type":"started","uploadId":"…","chunkSize":100,"totalChunks":3}
//! {"type":"progress","uploadId":"…","bytesReceived":200,"totalSize":300}
//! {"type":"completed","uploadId":"…","publicReference":"art_…","contentType":"application/pdf","sizeBytes":300,"fileName":"report.pdf","url":"…"}
//! {"type":"failed","uploadId":"…","errorKind":"SIZE_EXCEEDED","message":"…"}
//! {"type":"cancelled","uploadId":"…"}
//! {"type":"messageAccepted","messageId":"…"}
//! ```

mod connection;
pub mod frames;
pub mod misuse;

use crate::identity::UploaderIdentity;
use crate::state::AppState;
use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

pub use frames::{InboundFrame, OutboundFrame};

/// Upgrade `GET /api/v0/rooms/{room_id}/uploads/ws` to the upload protocol.
///
/// Identity is checked before the upgrade headers, so an anonymous caller gets 401.
pub async fn upload_ws(
    Path(room_id): Path<Uuid>,
    UploaderIdentity(uploader_id): UploaderIdentity,
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let max_message_bytes = state.config.ws_max_message_bytes();
    ws.max_message_size(max_message_bytes)
        .max_frame_size(max_message_bytes)
        .on_upgrade(move |socket| connection::run(socket, state, room_id, uploader_id))
}

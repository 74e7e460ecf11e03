use crate::events::{EventSink, UploadEvent};
use crate::finalizer::FinalizeRequest;
use crate::validator::DeclaredUpload;
use chrono::{DateTime, Utc};
use ferry_core::{SessionState, UploadError, UploadProgress, UploadSessionView};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Mutable record of one in-flight upload.
///
/// Only reachable through the store's per-session mutex; every method assumes the
/// caller holds that lock.
#[derive(Debug)]
pub struct UploadSession {
    upload_id: Uuid,
    uploader_id: Uuid,
    room_id: Uuid,
    declared: DeclaredUpload,
    received_chunks: BTreeSet<u32>,
    bytes_received: u64,
    /// Accepted payloads by sequence; `None` once released. Memory tracks
    /// `bytes_received`, never the declared size.
    buffer: Option<BTreeMap<u32, Vec<u8>>>,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    state: SessionState,
    events: EventSink,
}

impl UploadSession {
    pub fn new(
        upload_id: Uuid,
        uploader_id: Uuid,
        room_id: Uuid,
        declared: DeclaredUpload,
        events: EventSink,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            upload_id,
            uploader_id,
            room_id,
            declared,
            received_chunks: BTreeSet::new(),
            bytes_received: 0,
            buffer: Some(BTreeMap::new()),
            created_at: now,
            last_activity_at: now,
            closed_at: None,
            state: SessionState::Open,
            events,
        }
    }

    pub fn upload_id(&self) -> Uuid {
        self.upload_id
    }

    pub fn uploader_id(&self) -> Uuid {
        self.uploader_id
    }

    pub fn declared(&self) -> &DeclaredUpload {
        &self.declared
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn has_buffer(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn has_chunk(&self, sequence: u32) -> bool {
        self.received_chunks.contains(&sequence)
    }

    /// All declared chunks are in.
    pub fn is_complete(&self) -> bool {
        self.received_chunks.len() == self.declared.total_chunks as usize
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }

    pub fn progress(&self) -> UploadProgress {
        UploadProgress {
            upload_id: self.upload_id,
            bytes_received: self.bytes_received,
            total_size: self.declared.total_size,
        }
    }

    /// Keep a validated chunk until the upload is complete.
    pub fn write_chunk(&mut self, sequence: u32, payload: &[u8], now: DateTime<Utc>) {
        let Some(buffer) = self.buffer.as_mut() else {
            return;
        };
        if buffer.contains_key(&sequence) {
            return;
        }
        buffer.insert(sequence, payload.to_vec());

        self.received_chunks.insert(sequence);
        self.bytes_received += payload.len() as u64;
        self.last_activity_at = now;
    }

    /// `Open -> Completing`, handing the assembled bytes to the caller.
    ///
    /// Returns `None` unless the session is open and every chunk has arrived, so at most
    /// one caller ever receives a request for a given session.
    pub fn begin_completing(&mut self, now: DateTime<Utc>) -> Option<FinalizeRequest> {
        if self.state != SessionState::Open || !self.is_complete() {
            return None;
        }
        let chunks = self.buffer.take()?;
        // BTreeMap iterates in sequence order, so concatenation lays chunks at their offsets.
        let mut data = Vec::with_capacity(self.bytes_received as usize);
        for payload in chunks.into_values() {
            data.extend_from_slice(&payload);
        }

        self.state = SessionState::Completing;
        self.last_activity_at = now;

        Some(FinalizeRequest {
            upload_id: self.upload_id,
            uploader_id: self.uploader_id,
            room_id: self.room_id,
            file_name: self.declared.file_name.clone(),
            content_type: self.declared.content_type.clone(),
            total_size: self.declared.total_size,
            data,
        })
    }

    /// `Completing -> Completed | Failed` once the finalizer has returned.
    pub fn finish_completing(&mut self, succeeded: bool, now: DateTime<Utc>) {
        if self.state != SessionState::Completing {
            return;
        }
        self.state = if succeeded {
            SessionState::Completed
        } else {
            SessionState::Failed
        };
        self.closed_at = Some(now);
    }

    /// `Open -> Failed | Expired`, releasing the buffer.
    ///
    /// Shared by rejection, cancellation, expiry and shutdown drain. Returns whether the
    /// transition happened; sessions that are completing or already closed are left
    /// alone.
    pub fn close(&mut self, state: SessionState, now: DateTime<Utc>) -> bool {
        debug_assert!(matches!(state, SessionState::Failed | SessionState::Expired));
        if self.state != SessionState::Open {
            return false;
        }
        self.state = state;
        self.buffer = None;
        self.closed_at = Some(now);
        true
    }

    /// Close as `Failed`, log the terminal failure and tell the uploader.
    pub fn fail(&mut self, error: &UploadError, now: DateTime<Utc>) -> bool {
        if !self.close(SessionState::Failed, now) {
            return false;
        }
        self.report_failure(error);
        true
    }

    /// Log and deliver a failure for a session that has already reached a terminal state.
    pub fn report_failure(&self, error: &UploadError) {
        tracing::warn!(
            upload_id = %self.upload_id,
            error_kind = %error.kind,
            bytes_received = self.bytes_received,
            total_size = self.declared.total_size,
            error = %error.message,
            "Upload failed"
        );
        self.events.deliver(UploadEvent::Failed {
            upload_id: self.upload_id,
            error: error.clone(),
        });
    }

    pub fn view(&self) -> UploadSessionView {
        UploadSessionView {
            upload_id: self.upload_id,
            uploader_id: self.uploader_id,
            room_id: self.room_id,
            file_name: self.declared.file_name.clone(),
            content_type: self.declared.content_type.clone(),
            total_size: self.declared.total_size,
            total_chunks: self.declared.total_chunks,
            chunk_size: self.declared.chunk_size,
            chunks_received: self.received_chunks.len() as u32,
            bytes_received: self.bytes_received,
            progress_percent: self.progress().percent(),
            state: self.state,
            created_at: self.created_at,
            last_activity_at: self.last_activity_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> UploadSession {
        let (sink, _rx) = EventSink::channel(8);
        UploadSession::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            DeclaredUpload {
                file_name: "a.bin".to_string(),
                content_type: "application/zip".to_string(),
                total_size: 5,
                total_chunks: 3,
                chunk_size: 2,
            },
            sink,
            Utc::now(),
        )
    }

    #[test]
    fn writes_land_at_offsets() {
        let mut s = session();
        let now = Utc::now();
        s.write_chunk(2, b"e", now);
        s.write_chunk(0, b"ab", now);
        assert!(!s.is_complete());
        s.write_chunk(1, b"cd", now);
        assert!(s.is_complete());
        assert_eq!(s.bytes_received(), 5);

        let request = s.begin_completing(now).unwrap();
        assert_eq!(request.data, b"abcde");
        assert_eq!(s.state(), SessionState::Completing);
        assert!(!s.has_buffer());
        assert!(s.begin_completing(now).is_none());
    }

    fn buffered_bytes(s: &UploadSession) -> usize {
        s.buffer
            .as_ref()
            .map(|chunks| chunks.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    #[test]
    fn lone_final_chunk_does_not_reserve_declared_size() {
        let (sink, _rx) = EventSink::channel(8);
        let declared = DeclaredUpload {
            file_name: "big.zip".to_string(),
            content_type: "application/zip".to_string(),
            total_size: 100 * 1024 * 1024,
            total_chunks: 10_000,
            chunk_size: 10_486,
        };
        let last = declared.last_sequence();
        let tail_len = (declared.total_size - declared.offset_of(last)) as usize;
        let mut s = UploadSession::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            declared,
            sink,
            Utc::now(),
        );

        s.write_chunk(last, &vec![7u8; tail_len], Utc::now());
        assert_eq!(s.bytes_received(), 8086);
        assert_eq!(buffered_bytes(&s), 8086);
    }

    #[test]
    fn close_only_from_open() {
        let mut s = session();
        let now = Utc::now();
        assert!(s.close(SessionState::Expired, now));
        assert!(!s.has_buffer());
        assert_eq!(s.closed_at(), Some(now));
        assert!(!s.close(SessionState::Failed, now));
        assert_eq!(s.state(), SessionState::Expired);
    }

    #[test]
    fn completing_is_not_closable() {
        let mut s = session();
        let now = Utc::now();
        s.write_chunk(0, b"ab", now);
        s.write_chunk(1, b"cd", now);
        s.write_chunk(2, b"e", now);
        s.begin_completing(now).unwrap();
        assert!(!s.close(SessionState::Expired, now));
        s.finish_completing(true, now);
        assert_eq!(s.state(), SessionState::Completed);
    }

    #[test]
    fn view_reports_progress() {
        let mut s = session();
        s.write_chunk(0, b"ab", Utc::now());
        let view = s.view();
        assert_eq!(view.chunks_received, 1);
        assert_eq!(view.bytes_received, 2);
        assert_eq!(view.progress_percent, 40.0);
        assert_eq!(view.state, SessionState::Open);
    }
}

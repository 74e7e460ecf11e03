//! Upload session store
//!
//! The single shared mutable structure of the upload core. The map lock is only held to
//! look up, insert or purge; all mutation of one session is serialized by that
//! session's own mutex, so different uploads proceed in parallel.

use crate::events::{EventSink, UploadEvent};
use crate::session::UploadSession;
use crate::validator::DeclaredUpload;
use chrono::{DateTime, Utc};
use ferry_core::constants::MAX_OPEN_SESSIONS_PER_UPLOADER;
use ferry_core::{SessionState, UploadError, UploadSessionView};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

pub type SessionHandle = Arc<Mutex<UploadSession>>;

pub struct UploadSessionStore {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
    max_open_per_uploader: usize,
}

impl Default for UploadSessionStore {
    fn default() -> Self {
        Self::with_session_limit(MAX_OPEN_SESSIONS_PER_UPLOADER)
    }
}

impl UploadSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store allowing each uploader at most `max_open_per_uploader` open sessions.
    pub fn with_session_limit(max_open_per_uploader: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_open_per_uploader: max_open_per_uploader.max(1),
        }
    }

    /// Register a new `Open` session under a fresh id and announce it on `events`.
    ///
    /// The open-session count is taken under the map's write lock, so concurrent
    /// creates by one uploader cannot overshoot the limit. Nothing holding a session
    /// mutex ever waits on the map lock, so locking sessions here cannot deadlock.
    pub async fn create(
        &self,
        uploader_id: Uuid,
        room_id: Uuid,
        declared: DeclaredUpload,
        events: EventSink,
    ) -> Result<(Uuid, SessionHandle), UploadError> {
        let now = Utc::now();
        let chunk_size = declared.chunk_size;
        let total_chunks = declared.total_chunks;

        let mut sessions = self.sessions.write().await;

        let mut open = 0;
        for handle in sessions.values() {
            let session = handle.lock().await;
            if session.uploader_id() == uploader_id && session.state() == SessionState::Open {
                open += 1;
            }
        }
        if open >= self.max_open_per_uploader {
            tracing::warn!(
                uploader_id = %uploader_id,
                open_sessions = open,
                limit = self.max_open_per_uploader,
                "Upload session limit reached"
            );
            return Err(UploadError::too_many_sessions(self.max_open_per_uploader));
        }

        let mut upload_id = Uuid::new_v4();
        while sessions.contains_key(&upload_id) {
            upload_id = Uuid::new_v4();
        }

        let session =
            UploadSession::new(upload_id, uploader_id, room_id, declared, events.clone(), now);
        let handle = Arc::new(Mutex::new(session));
        sessions.insert(upload_id, handle.clone());
        drop(sessions);

        tracing::debug!(
            upload_id = %upload_id,
            uploader_id = %uploader_id,
            room_id = %room_id,
            chunk_size,
            total_chunks,
            "Upload session created"
        );

        // Awaited so the client learns the id before any progress for it.
        events
            .send(UploadEvent::Started {
                upload_id,
                chunk_size,
                total_chunks,
            })
            .await;

        Ok((upload_id, handle))
    }

    pub async fn get(&self, upload_id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&upload_id).cloned()
    }

    pub async fn snapshot(&self, upload_id: Uuid) -> Option<UploadSessionView> {
        let handle = self.get(upload_id).await?;
        let session = handle.lock().await;
        Some(session.view())
    }

    /// Owner-initiated `Open -> Failed`.
    ///
    /// Unknown ids, foreign sessions and sessions that are no longer open are all
    /// reported as `UnknownOrClosedSession`.
    pub async fn cancel(
        &self,
        upload_id: Uuid,
        uploader_id: Uuid,
    ) -> Result<UploadSessionView, UploadError> {
        let handle = self
            .get(upload_id)
            .await
            .ok_or_else(|| UploadError::unknown_session(upload_id))?;
        let mut session = handle.lock().await;

        if session.uploader_id() != uploader_id {
            return Err(UploadError::unknown_session(upload_id));
        }

        if !session.close(SessionState::Failed, Utc::now()) {
            return Err(UploadError::session_closed(upload_id, session.state()));
        }

        tracing::info!(
            upload_id = %upload_id,
            bytes_received = session.bytes_received(),
            total_size = session.declared().total_size,
            "Upload cancelled by uploader"
        );

        Ok(session.view())
    }

    /// Ids of the uploader's sessions that are still accepting chunks.
    pub async fn open_sessions_for(&self, uploader_id: Uuid) -> Vec<Uuid> {
        let mut open = Vec::new();
        for (upload_id, handle) in self.handles().await {
            let session = handle.lock().await;
            if session.uploader_id() == uploader_id && session.state() == SessionState::Open {
                open.push(upload_id);
            }
        }
        open
    }

    /// Number of sessions held, tombstones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Snapshot of all handles, taken under the read lock and released immediately.
    pub async fn handles(&self) -> Vec<(Uuid, SessionHandle)> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(id, handle)| (*id, handle.clone()))
            .collect()
    }

    /// Fail every open session. Used at shutdown so no buffer outlives the server.
    pub async fn drain(&self) -> usize {
        let now = Utc::now();
        let mut drained = 0;
        for (_, handle) in self.handles().await {
            let mut session = handle.lock().await;
            if session.close(SessionState::Failed, now) {
                drained += 1;
            }
        }
        if drained > 0 {
            tracing::info!(drained, "Drained open upload sessions");
        }
        drained
    }

    /// Remove terminal sessions that were closed before `older_than`.
    pub async fn purge_terminal(&self, older_than: DateTime<Utc>) -> usize {
        let mut stale = Vec::new();
        for (upload_id, handle) in self.handles().await {
            let session = handle.lock().await;
            let expired_tombstone = session.state().is_terminal()
                && session.closed_at().is_some_and(|closed| closed < older_than);
            if expired_tombstone {
                stale.push(upload_id);
            }
        }

        if stale.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        for upload_id in &stale {
            sessions.remove(upload_id);
        }
        before - sessions.len()
    }
}

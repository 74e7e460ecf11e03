//! Chunk assembly
//!
//! Accepts decoded chunks, writes them into their session's buffer by offset and, when
//! the last missing chunk arrives, runs the finalizer on that caller's path.

use crate::events::{EventSink, UploadEvent};
use crate::finalizer::ArtifactFinalizer;
use crate::store::UploadSessionStore;
use crate::validator::{self, BeginUpload, DeclaredUpload};
use chrono::Utc;
use ferry_core::{Artifact, SessionState, UploadError, UploadLimits, UploadProgress};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum AssemblyOutcome {
    /// Chunk buffered; more are missing.
    Accepted(UploadProgress),
    /// Sequence already accepted, or the session is already being finalized.
    /// Carries the unchanged progress.
    DuplicateIgnored(UploadProgress),
    /// This chunk completed the upload.
    Completed(Artifact),
    /// The chunk or the finalization failed and the session is now `Failed`.
    Rejected(UploadError),
}

pub struct ChunkAssembler {
    store: Arc<UploadSessionStore>,
    finalizer: Arc<ArtifactFinalizer>,
    limits: UploadLimits,
}

impl ChunkAssembler {
    pub fn new(
        store: Arc<UploadSessionStore>,
        finalizer: Arc<ArtifactFinalizer>,
        limits: UploadLimits,
    ) -> Self {
        Self {
            store,
            finalizer,
            limits,
        }
    }

    pub fn store(&self) -> &Arc<UploadSessionStore> {
        &self.store
    }

    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    /// Validate a declaration and open a session for it.
    pub async fn begin(
        &self,
        uploader_id: Uuid,
        room_id: Uuid,
        begin: BeginUpload,
        events: EventSink,
    ) -> Result<(Uuid, DeclaredUpload), UploadError> {
        let declared = validator::validate_begin(begin, &self.limits)?;
        let (upload_id, _) = self
            .store
            .create(uploader_id, room_id, declared.clone(), events)
            .await?;
        Ok((upload_id, declared))
    }

    /// Record one chunk of an existing session.
    ///
    /// `Err` is reserved for chunks that cannot be attributed to an open session of
    /// this uploader; such chunks change nothing. Every other outcome, including
    /// rejections, has already been applied to the session and reported on its sink.
    pub async fn accept(
        &self,
        upload_id: Uuid,
        uploader_id: Uuid,
        sequence: i64,
        payload: &[u8],
    ) -> Result<AssemblyOutcome, UploadError> {
        let handle = self
            .store
            .get(upload_id)
            .await
            .ok_or_else(|| validator::validate_unknown(upload_id))?;

        let mut session = handle.lock().await;

        if session.uploader_id() != uploader_id {
            return Err(validator::validate_unknown(upload_id));
        }

        match session.state() {
            SessionState::Open => {}
            SessionState::Completing => {
                return Ok(AssemblyOutcome::DuplicateIgnored(session.progress()))
            }
            state => return Err(UploadError::session_closed(upload_id, state)),
        }

        let now = Utc::now();

        let sequence = match validator::validate_sequence(session.declared(), sequence) {
            Ok(sequence) => sequence,
            Err(e) => {
                session.fail(&e, now);
                return Ok(AssemblyOutcome::Rejected(e));
            }
        };

        if session.has_chunk(sequence) {
            session.touch(now);
            tracing::debug!(upload_id = %upload_id, sequence, "Duplicate chunk ignored");
            return Ok(AssemblyOutcome::DuplicateIgnored(session.progress()));
        }

        if let Err(e) = validator::validate_payload(
            session.declared(),
            &self.limits,
            session.bytes_received(),
            sequence,
            payload.len() as u64,
        ) {
            session.fail(&e, now);
            return Ok(AssemblyOutcome::Rejected(e));
        }

        session.write_chunk(sequence, payload, now);
        let progress = session.progress();
        session.events().progress(progress);

        let Some(request) = session.begin_completing(now) else {
            return Ok(AssemblyOutcome::Accepted(progress));
        };
        let events = session.events().clone();
        drop(session);

        tracing::debug!(upload_id = %upload_id, "All chunks received, finalizing");
        let result = self.finalizer.finalize(request).await;

        let mut session = handle.lock().await;
        match result {
            Ok(artifact) => {
                session.finish_completing(true, Utc::now());
                events.deliver(UploadEvent::Completed {
                    upload_id,
                    artifact: artifact.clone(),
                });
                Ok(AssemblyOutcome::Completed(artifact))
            }
            Err(e) => {
                session.finish_completing(false, Utc::now());
                session.report_failure(&e);
                Ok(AssemblyOutcome::Rejected(e))
            }
        }
    }
}

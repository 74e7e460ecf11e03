use crate::events::UploadEvent;
use crate::store::UploadSessionStore;
use chrono::{DateTime, Utc};
use ferry_core::{FerryConfig, SessionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Result of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapReport {
    pub expired: usize,
    pub purged: usize,
}

/// Background sweep bounding how long an abandoned upload can pin memory.
#[derive(Clone)]
pub struct SessionReaper {
    store: Arc<UploadSessionStore>,
    idle_timeout: chrono::Duration,
    max_lifetime: chrono::Duration,
    tombstone_retention: chrono::Duration,
    sweep_interval: Duration,
}

impl SessionReaper {
    pub fn new(
        store: Arc<UploadSessionStore>,
        idle_timeout: Duration,
        max_lifetime: Duration,
        tombstone_retention: Duration,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            store,
            idle_timeout: to_chrono(idle_timeout),
            max_lifetime: to_chrono(max_lifetime),
            tombstone_retention: to_chrono(tombstone_retention),
            sweep_interval,
        }
    }

    pub fn from_config(store: Arc<UploadSessionStore>, config: &FerryConfig) -> Self {
        Self::new(
            store,
            config.idle_timeout(),
            config.max_session_lifetime(),
            config.tombstone_retention(),
            config.reaper_interval(),
        )
    }

    /// Start the background sweep on the configured interval.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep_interval = interval(self.sweep_interval);

            loop {
                sweep_interval.tick().await;

                let report = self.sweep(Utc::now()).await;
                if report != ReapReport::default() {
                    tracing::info!(
                        expired = report.expired,
                        purged = report.purged,
                        "Upload session sweep completed"
                    );
                }
            }
        })
    }

    /// Expire idle or over-age open sessions and purge old tombstones.
    ///
    /// Takes each session's mutex, so an expiry can never interleave with the chunk
    /// that would have completed the same session.
    #[tracing::instrument(skip(self), fields(reaper.operation = "sweep"))]
    pub async fn sweep(&self, now: DateTime<Utc>) -> ReapReport {
        let mut report = ReapReport::default();

        for (upload_id, handle) in self.store.handles().await {
            let mut session = handle.lock().await;
            if session.state() != SessionState::Open {
                continue;
            }

            let idle = now - session.last_activity_at() > self.idle_timeout;
            let over_age = now - session.created_at() > self.max_lifetime;
            if !(idle || over_age) {
                continue;
            }

            if session.close(SessionState::Expired, now) {
                report.expired += 1;
                tracing::warn!(
                    upload_id = %upload_id,
                    error_kind = "SESSION_EXPIRED",
                    bytes_received = session.bytes_received(),
                    total_size = session.declared().total_size,
                    idle,
                    over_age,
                    "Upload session expired"
                );
                session.events().deliver(UploadEvent::Expired { upload_id });
            }
        }

        report.purged = self
            .store
            .purge_terminal(now - self.tombstone_retention)
            .await;

        report
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(36_500))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventSink;
    use crate::validator::DeclaredUpload;
    use ferry_core::UploadErrorKind;
    use uuid::Uuid;

    fn declared() -> DeclaredUpload {
        DeclaredUpload {
            file_name: "movie.mkv".to_string(),
            content_type: "video/x-matroska".to_string(),
            total_size: 4,
            total_chunks: 2,
            chunk_size: 2,
        }
    }

    fn reaper(store: Arc<UploadSessionStore>) -> SessionReaper {
        SessionReaper::new(
            store,
            Duration::from_secs(60),
            Duration::from_secs(600),
            Duration::from_secs(300),
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn idle_session_expires_and_rejects_late_chunks() {
        let store = Arc::new(UploadSessionStore::new());
        let (sink, mut rx) = EventSink::channel(8);
        let (upload_id, handle) = store
            .create(Uuid::new_v4(), Uuid::new_v4(), declared(), sink)
            .await
            .unwrap();
        handle.lock().await.write_chunk(0, b"ab", Utc::now());

        let reaper = reaper(store.clone());
        assert_eq!(reaper.sweep(Utc::now()).await.expired, 0);

        let later = Utc::now() + chrono::Duration::seconds(61);
        let report = reaper.sweep(later).await;
        assert_eq!(report.expired, 1);

        {
            let session = handle.lock().await;
            assert_eq!(session.state(), SessionState::Expired);
            assert!(!session.has_buffer());
        }

        assert!(matches!(rx.recv().await, Some(UploadEvent::Started { .. })));
        assert!(matches!(rx.recv().await, Some(UploadEvent::Expired { .. })));

        let uploader_id = handle.lock().await.uploader_id();
        let err = store.cancel(upload_id, uploader_id).await.unwrap_err();
        assert_eq!(err.kind, UploadErrorKind::UnknownOrClosedSession);
    }

    #[tokio::test]
    async fn over_age_session_expires_despite_activity() {
        let store = Arc::new(UploadSessionStore::new());
        let (sink, _rx) = EventSink::channel(8);
        let (_, handle) = store
            .create(Uuid::new_v4(), Uuid::new_v4(), declared(), sink)
            .await
            .unwrap();

        let later = Utc::now() + chrono::Duration::seconds(601);
        handle.lock().await.touch(later);

        let report = reaper(store.clone()).sweep(later).await;
        assert_eq!(report.expired, 1);
    }

    #[tokio::test]
    async fn completing_sessions_are_left_alone() {
        let store = Arc::new(UploadSessionStore::new());
        let (sink, _rx) = EventSink::channel(8);
        let (_, handle) = store
            .create(Uuid::new_v4(), Uuid::new_v4(), declared(), sink)
            .await
            .unwrap();
        {
            let mut session = handle.lock().await;
            let now = Utc::now();
            session.write_chunk(0, b"ab", now);
            session.write_chunk(1, b"cd", now);
            session.begin_completing(now).unwrap();
        }

        let report = reaper(store.clone())
            .sweep(Utc::now() + chrono::Duration::seconds(3600))
            .await;
        assert_eq!(report, ReapReport::default());
        assert_eq!(handle.lock().await.state(), SessionState::Completing);
    }

    #[tokio::test]
    async fn tombstones_purged_after_retention() {
        let store = Arc::new(UploadSessionStore::new());
        let (sink, _rx) = EventSink::channel(8);
        store
            .create(Uuid::new_v4(), Uuid::new_v4(), declared(), sink)
            .await
            .unwrap();
        let reaper = reaper(store.clone());

        let expired_at = Utc::now() + chrono::Duration::seconds(61);
        assert_eq!(reaper.sweep(expired_at).await.expired, 1);
        assert_eq!(store.len().await, 1);

        let report = reaper
            .sweep(expired_at + chrono::Duration::seconds(301))
            .await;
        assert_eq!(report.purged, 1);
        assert!(store.is_empty().await);
    }
}

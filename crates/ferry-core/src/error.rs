//! Error types module
//!
//! `UploadError` is the closed failure taxonomy of the chunked-upload protocol. Every
//! rejection the upload core produces is one of its seven kinds, and the kind is what
//! travels back to the uploader in a failure frame.
//!
//! `AppError` unifies upload failures with the handful of service-level errors the
//! HTTP surface needs (not found, bad input, internal faults).

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;
use uuid::Uuid;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like resource limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "SIZE_EXCEEDED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// The closed set of upload failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadErrorKind {
    /// Bad sequence number, malformed length or inconsistent declaration.
    InvalidChunk,
    /// The upload would exceed the configured maximum or its declared size.
    SizeExceeded,
    /// Chunk for an id that is unknown, foreign or already terminal.
    UnknownOrClosedSession,
    /// Neither content type nor extension is allow-listed.
    UnsupportedType,
    /// I/O fault while persisting the artifact.
    StorageWriteFailed,
    /// Session reaped for inactivity or age.
    SessionExpired,
    /// A non-chunk frame carrying something that looks like a storage path.
    MisusedTransport,
}

impl UploadErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadErrorKind::InvalidChunk => "INVALID_CHUNK",
            UploadErrorKind::SizeExceeded => "SIZE_EXCEEDED",
            UploadErrorKind::UnknownOrClosedSession => "UNKNOWN_OR_CLOSED_SESSION",
            UploadErrorKind::UnsupportedType => "UNSUPPORTED_TYPE",
            UploadErrorKind::StorageWriteFailed => "STORAGE_WRITE_FAILED",
            UploadErrorKind::SessionExpired => "SESSION_EXPIRED",
            UploadErrorKind::MisusedTransport => "MISUSED_TRANSPORT",
        }
    }
}

impl Display for UploadErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A typed upload rejection: the kind plus a human readable explanation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct UploadError {
    pub kind: UploadErrorKind,
    pub message: String,
}

impl UploadError {
    pub fn new(kind: UploadErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_chunk(message: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::InvalidChunk, message)
    }

    pub fn size_exceeded(attempted: u64, limit: u64) -> Self {
        Self::new(
            UploadErrorKind::SizeExceeded,
            format!("upload would reach {} bytes, limit is {} bytes", attempted, limit),
        )
    }

    pub fn unknown_session(upload_id: Uuid) -> Self {
        Self::new(
            UploadErrorKind::UnknownOrClosedSession,
            format!("no upload session {}", upload_id),
        )
    }

    pub fn session_closed(upload_id: Uuid, state: impl Display) -> Self {
        Self::new(
            UploadErrorKind::UnknownOrClosedSession,
            format!("upload session {} is closed ({})", upload_id, state),
        )
    }

    pub fn unsupported_type(content_type: &str, file_name: &str) -> Self {
        Self::new(
            UploadErrorKind::UnsupportedType,
            format!(
                "neither content type '{}' nor the extension of '{}' is allowed",
                content_type, file_name
            ),
        )
    }

    /// The uploader already holds `limit` open sessions.
    pub fn too_many_sessions(limit: usize) -> Self {
        Self::new(
            UploadErrorKind::SizeExceeded,
            format!(
                "too many uploads in progress (limit {}); finish or cancel one first",
                limit
            ),
        )
    }

    pub fn storage_write_failed(message: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::StorageWriteFailed, message)
    }

    pub fn session_expired(upload_id: Uuid) -> Self {
        Self::new(
            UploadErrorKind::SessionExpired,
            format!("upload session {} expired without activity", upload_id),
        )
    }

    pub fn misused_transport() -> Self {
        Self::new(
            UploadErrorKind::MisusedTransport,
            "message content looks like a storage path; send the file through the chunked upload frames instead",
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No attachment: {0}")]
    NoAttachment(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each upload kind: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn upload_error_static_metadata(
    kind: UploadErrorKind,
) -> (u16, &'static str, bool, Option<&'static str>, bool, LogLevel) {
    match kind {
        UploadErrorKind::InvalidChunk => (
            400,
            kind.as_str(),
            false,
            Some("Check sequence numbers and chunk lengths, then start a new upload"),
            false,
            LogLevel::Debug,
        ),
        UploadErrorKind::SizeExceeded => (
            413,
            kind.as_str(),
            false,
            Some("Reduce file size"),
            false,
            LogLevel::Debug,
        ),
        UploadErrorKind::UnknownOrClosedSession => (
            410,
            kind.as_str(),
            false,
            Some("Start a new upload"),
            false,
            LogLevel::Debug,
        ),
        UploadErrorKind::UnsupportedType => (
            415,
            kind.as_str(),
            false,
            Some("Upload an image, document or video in an allowed format"),
            false,
            LogLevel::Debug,
        ),
        UploadErrorKind::StorageWriteFailed => (
            500,
            kind.as_str(),
            true,
            Some("Retry the upload after a short delay"),
            true,
            LogLevel::Error,
        ),
        UploadErrorKind::SessionExpired => (
            408,
            kind.as_str(),
            true,
            Some("Start a new upload and keep sending chunks"),
            false,
            LogLevel::Warn,
        ),
        UploadErrorKind::MisusedTransport => (
            422,
            kind.as_str(),
            false,
            Some("Send files through the chunked upload frames"),
            false,
            LogLevel::Warn,
        ),
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (u16, &'static str, bool, Option<&'static str>, bool, LogLevel) {
    match err {
        AppError::Upload(upload) => upload_error_static_metadata(upload.kind),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::NoAttachment(_) => (
            404,
            "NO_ATTACHMENT",
            false,
            Some("This message has no attachment"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Connect through the authenticating proxy"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Upload(_) => "Upload",
            AppError::Storage(_) => "Storage",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::NoAttachment(_) => "NoAttachment",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Upload(err) if err.kind == UploadErrorKind::StorageWriteFailed => {
                "Failed to store the uploaded file".to_string()
            }
            AppError::Upload(err) => err.message.clone(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::NoAttachment(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

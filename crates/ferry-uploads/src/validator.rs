//! Declaration and per-chunk checks.
//!
//! Everything here is pure: the functions look at a declaration or a session's counters
//! and either accept or return the typed rejection. Mutation happens in the store and
//! the assembler.

use ferry_core::constants::MAX_FILE_NAME_LENGTH;
use ferry_core::{UploadError, UploadLimits};
use uuid::Uuid;

/// What the client claims about an upload when it starts one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeginUpload {
    pub file_name: String,
    pub content_type: String,
    pub total_size: u64,
    pub total_chunks: u64,
    /// Explicit chunk size; derived from the other two when absent.
    pub chunk_size: Option<u64>,
}

/// A declaration that passed [`validate_begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredUpload {
    pub file_name: String,
    pub content_type: String,
    pub total_size: u64,
    pub total_chunks: u32,
    pub chunk_size: u64,
}

impl DeclaredUpload {
    pub fn last_sequence(&self) -> u32 {
        self.total_chunks - 1
    }

    /// Byte offset a chunk is written at.
    pub fn offset_of(&self, sequence: u32) -> u64 {
        sequence as u64 * self.chunk_size
    }
}

pub fn validate_begin(
    begin: BeginUpload,
    limits: &UploadLimits,
) -> Result<DeclaredUpload, UploadError> {
    if begin.file_name.trim().is_empty() {
        return Err(UploadError::invalid_chunk("fileName must not be empty"));
    }

    if begin.file_name.chars().count() > MAX_FILE_NAME_LENGTH {
        return Err(UploadError::invalid_chunk(format!(
            "fileName exceeds {} characters",
            MAX_FILE_NAME_LENGTH
        )));
    }

    if begin.total_size == 0 {
        return Err(UploadError::invalid_chunk("totalSize must be greater than 0"));
    }

    if begin.total_chunks == 0 {
        return Err(UploadError::invalid_chunk("totalChunks must be greater than 0"));
    }

    if begin.total_size > limits.max_artifact_size {
        return Err(UploadError::size_exceeded(
            begin.total_size,
            limits.max_artifact_size,
        ));
    }

    if begin.total_chunks > limits.max_chunk_count as u64 {
        return Err(UploadError::invalid_chunk(format!(
            "totalChunks {} exceeds maximum {}; use larger chunks",
            begin.total_chunks, limits.max_chunk_count
        )));
    }

    let chunk_size = match begin.chunk_size {
        Some(0) => return Err(UploadError::invalid_chunk("chunkSize must be greater than 0")),
        Some(size) => size,
        None => begin.total_size.div_ceil(begin.total_chunks),
    };

    let expected_chunks = begin.total_size.div_ceil(chunk_size);
    if expected_chunks != begin.total_chunks {
        return Err(UploadError::invalid_chunk(format!(
            "totalChunks {} is inconsistent with totalSize {} in chunks of {} bytes (expected {})",
            begin.total_chunks, begin.total_size, chunk_size, expected_chunks
        )));
    }

    Ok(DeclaredUpload {
        file_name: begin.file_name,
        content_type: begin.content_type,
        total_size: begin.total_size,
        total_chunks: begin.total_chunks as u32,
        chunk_size,
    })
}

/// Range check of a wire sequence number, which is zero-based.
pub fn validate_sequence(declared: &DeclaredUpload, sequence: i64) -> Result<u32, UploadError> {
    if sequence < 0 || sequence >= declared.total_chunks as i64 {
        return Err(UploadError::invalid_chunk(format!(
            "sequenceNumber {} is outside 0..{}",
            sequence, declared.total_chunks
        )));
    }
    Ok(sequence as u32)
}

/// Size and shape checks of one chunk payload.
///
/// The size cap is checked first so an oversized stream fails before any of the
/// offending payload is buffered.
pub fn validate_payload(
    declared: &DeclaredUpload,
    limits: &UploadLimits,
    bytes_received: u64,
    sequence: u32,
    payload_len: u64,
) -> Result<(), UploadError> {
    let cap = limits.max_artifact_size.min(declared.total_size);
    let attempted = bytes_received.saturating_add(payload_len);
    if attempted > cap {
        return Err(UploadError::size_exceeded(attempted, cap));
    }

    if payload_len == 0 {
        return Err(UploadError::invalid_chunk(format!(
            "chunk {} has an empty payload",
            sequence
        )));
    }

    if payload_len > declared.chunk_size {
        return Err(UploadError::invalid_chunk(format!(
            "chunk {} is {} bytes, chunk size is {}",
            sequence, payload_len, declared.chunk_size
        )));
    }

    if sequence != declared.last_sequence() && payload_len != declared.chunk_size {
        return Err(UploadError::invalid_chunk(format!(
            "chunk {} is {} bytes; only the final chunk may be shorter than {}",
            sequence, payload_len, declared.chunk_size
        )));
    }

    if declared.offset_of(sequence) + payload_len > declared.total_size {
        return Err(UploadError::invalid_chunk(format!(
            "chunk {} extends past the declared size of {} bytes",
            sequence, declared.total_size
        )));
    }

    Ok(())
}

/// Rejection for a chunk frame naming an id the store does not know.
pub fn validate_unknown(upload_id: Uuid) -> UploadError {
    UploadError::unknown_session(upload_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::UploadErrorKind;

    fn limits() -> UploadLimits {
        UploadLimits {
            max_artifact_size: 1000,
            max_chunk_count: 16,
        }
    }

    fn begin(total_size: u64, total_chunks: u64, chunk_size: Option<u64>) -> BeginUpload {
        BeginUpload {
            file_name: "report.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            total_size,
            total_chunks,
            chunk_size,
        }
    }

    fn declared_300() -> DeclaredUpload {
        validate_begin(begin(300, 3, None), &limits()).unwrap()
    }

    #[test]
    fn begin_derives_chunk_size() {
        let declared = validate_begin(begin(250, 3, None), &limits()).unwrap();
        assert_eq!(declared.chunk_size, 84);
        assert_eq!(declared.total_chunks, 3);

        let declared = validate_begin(begin(250, 3, Some(100)), &limits()).unwrap();
        assert_eq!(declared.chunk_size, 100);
    }

    #[test]
    fn begin_rejects_malformed_declarations() {
        let kind = |b| validate_begin(b, &limits()).unwrap_err().kind;

        assert_eq!(kind(begin(0, 1, None)), UploadErrorKind::InvalidChunk);
        assert_eq!(kind(begin(10, 0, None)), UploadErrorKind::InvalidChunk);
        assert_eq!(kind(begin(100, 17, None)), UploadErrorKind::InvalidChunk);
        assert_eq!(kind(begin(100, 1, Some(0))), UploadErrorKind::InvalidChunk);
        assert_eq!(kind(begin(300, 2, Some(100))), UploadErrorKind::InvalidChunk);
        assert_eq!(kind(begin(10, 6, None)), UploadErrorKind::InvalidChunk);

        let mut unnamed = begin(10, 1, None);
        unnamed.file_name = "  ".to_string();
        assert_eq!(kind(unnamed), UploadErrorKind::InvalidChunk);

        let mut long_name = begin(10, 1, None);
        long_name.file_name = format!("{}.txt", "a".repeat(MAX_FILE_NAME_LENGTH));
        assert_eq!(kind(long_name), UploadErrorKind::InvalidChunk);

        let mut longest = begin(10, 1, None);
        longest.file_name = "a".repeat(MAX_FILE_NAME_LENGTH);
        assert!(validate_begin(longest, &limits()).is_ok());
    }

    #[test]
    fn begin_rejects_oversized_declaration() {
        let err = validate_begin(begin(1001, 11, Some(100)), &limits()).unwrap_err();
        assert_eq!(err.kind, UploadErrorKind::SizeExceeded);
    }

    #[test]
    fn sequence_is_zero_based() {
        let declared = declared_300();
        assert_eq!(validate_sequence(&declared, 0).unwrap(), 0);
        assert_eq!(validate_sequence(&declared, 2).unwrap(), 2);
        assert!(validate_sequence(&declared, 3).is_err());
        assert!(validate_sequence(&declared, -1).is_err());
    }

    #[test]
    fn payload_shape_rules() {
        let declared = validate_begin(begin(250, 3, Some(100)), &limits()).unwrap();
        let l = limits();

        assert!(validate_payload(&declared, &l, 0, 0, 100).is_ok());
        assert!(validate_payload(&declared, &l, 200, 2, 50).is_ok());

        let kind = |received, seq, len| {
            validate_payload(&declared, &l, received, seq, len)
                .unwrap_err()
                .kind
        };
        assert_eq!(kind(0, 0, 0), UploadErrorKind::InvalidChunk);
        assert_eq!(kind(0, 0, 99), UploadErrorKind::InvalidChunk);
        assert_eq!(kind(0, 0, 101), UploadErrorKind::InvalidChunk);
        // Final chunk first, longer than what the declared size leaves for it
        assert_eq!(kind(0, 2, 100), UploadErrorKind::InvalidChunk);
    }

    #[test]
    fn size_cap_checked_before_shape() {
        let declared = validate_begin(begin(250, 3, Some(100)), &limits()).unwrap();
        let err = validate_payload(&declared, &limits(), 200, 2, 100).unwrap_err();
        assert_eq!(err.kind, UploadErrorKind::SizeExceeded);
    }

    #[test]
    fn size_cap_uses_configured_maximum() {
        let declared = declared_300();
        let tight = UploadLimits {
            max_artifact_size: 150,
            max_chunk_count: 16,
        };
        let err = validate_payload(&declared, &tight, 100, 1, 100).unwrap_err();
        assert_eq!(err.kind, UploadErrorKind::SizeExceeded);
    }

    #[test]
    fn unknown_session_kind() {
        assert_eq!(
            validate_unknown(Uuid::new_v4()).kind,
            UploadErrorKind::UnknownOrClosedSession
        );
    }
}

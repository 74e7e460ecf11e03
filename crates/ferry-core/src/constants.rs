//! Shared constants

/// API path prefix
pub const API_PREFIX: &str = "/api/v0";

/// Root directory (and key prefix) under which artifacts are filed by category
pub const UPLOAD_ROOT: &str = "uploads";

/// Upper bound on the number of chunks a single upload may declare
pub const MAX_CHUNK_COUNT: u32 = 10_000;

/// Longest sanitized base name kept in a storage key
pub const MAX_KEY_NAME_LENGTH: usize = 64;

/// Longest client file name accepted in a begin frame
pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// Default cap on open upload sessions held by one uploader
pub const MAX_OPEN_SESSIONS_PER_UPLOADER: usize = 8;

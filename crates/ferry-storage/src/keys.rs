//! Shared key generation for artifacts.
//!
//! Key format: `uploads/{category}/{yyyymmddThhmmssZ}_{sanitized_name}_{suffix}` where the
//! suffix is 8 random hex characters.

use chrono::{DateTime, Utc};
use ferry_core::constants::UPLOAD_ROOT;
use ferry_core::validation::sanitize_file_name;
use ferry_core::MediaCategory;

/// Generate the storage key for a new artifact.
///
/// The client file name only contributes a sanitized, length-bounded fragment; the time
/// prefix and random suffix keep keys unique when the same name is uploaded twice.
pub fn generate_artifact_key(
    category: MediaCategory,
    file_name: &str,
    now: DateTime<Utc>,
) -> String {
    let suffix: [u8; 4] = rand::random();
    format!(
        "{}/{}/{}_{}_{}",
        UPLOAD_ROOT,
        category.as_dir(),
        now.format("%Y%m%dT%H%M%SZ"),
        sanitize_file_name(file_name),
        hex::encode(suffix)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_key_layout() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let key = generate_artifact_key(MediaCategory::Images, "holiday photo.jpg", now);

        assert!(key.starts_with("uploads/images/20240309T140507Z_holiday_photo.jpg_"));
        let suffix = key.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_never_escapes_category_dir() {
        let now = Utc::now();
        let key = generate_artifact_key(MediaCategory::Documents, "../../etc/passwd", now);
        assert!(key.starts_with("uploads/documents/"));
        assert!(!key.contains(".."));
        assert_eq!(key.matches('/').count(), 2);
    }

    #[test]
    fn test_same_name_gets_distinct_keys() {
        let now = Utc::now();
        let a = generate_artifact_key(MediaCategory::Video, "clip.mp4", now);
        let b = generate_artifact_key(MediaCategory::Video, "clip.mp4", now);
        assert_ne!(a, b);
    }
}

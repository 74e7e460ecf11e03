//! Detection of files smuggled through the message channel.
//!
//! Clients that skip the chunk frames sometimes post the storage key or local path of
//! a file as message text, hoping the server will materialize it. Such messages are
//! refused with `MisusedTransport` before anything is created.

use regex::Regex;
use std::sync::LazyLock;

static STORAGE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|[\s'`(]|/)uploads/[a-z0-9_-]+/\S+").expect("storage key pattern is valid")
});

static GENERATED_DIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|[\s'`(]|/)auto_generated/").expect("generated dir pattern is valid")
});

/// Links are not paths; they are blanked before the key patterns run.
static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z][a-z0-9+.-]*://[^\s/]+\S*").expect("url pattern is valid")
});

/// A message made of nothing but an absolute file path with an extension.
static BARE_LOCAL_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(/|~/|file://|[A-Za-z]:[\\/])\S*\.[A-Za-z0-9]{1,8}$")
        .expect("local path pattern is valid")
});

pub fn looks_like_storage_path(content: &str) -> bool {
    let content = content.trim();
    if BARE_LOCAL_PATH.is_match(content) {
        return true;
    }
    let content = URL.replace_all(content, " ");
    STORAGE_KEY.is_match(&content) || GENERATED_DIR.is_match(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_detected() {
        assert!(looks_like_storage_path(
            "uploads/auto_generated/20250101T000000Z_report_ab12cd34.pdf"
        ));
        assert!(looks_like_storage_path(
            "here you go: uploads/documents/20250101T000000Z_report_ab12cd34.pdf"
        ));
        assert!(looks_like_storage_path("see auto_generated/output.csv"));
        assert!(looks_like_storage_path(
            "it is at /srv/ferry/uploads/images/20250101T000000Z_a_ab12cd34.png now"
        ));
    }

    #[test]
    fn test_bare_local_paths_detected() {
        assert!(looks_like_storage_path("/home/alice/Downloads/photo.jpg"));
        assert!(looks_like_storage_path("  ~/notes/todo.md  "));
        assert!(looks_like_storage_path(r"C:\Users\bob\report.docx"));
        assert!(looks_like_storage_path("file:///tmp/clip.mp4"));
    }

    #[test]
    fn test_ordinary_messages_pass() {
        assert!(!looks_like_storage_path("hello room"));
        assert!(!looks_like_storage_path("the uploads are slow today"));
        assert!(!looks_like_storage_path("I put it in /tmp somewhere, report.pdf"));
        assert!(!looks_like_storage_path("https://example.com/uploads"));
        assert!(!looks_like_storage_path("ratio is 3/4 and 1.5"));
        assert!(!looks_like_storage_path("https://cdn.example.com/uploads/images/a.png"));
        assert!(!looks_like_storage_path(
            "mirror: https://cdn.example.com/auto_generated/report.pdf (old copy)"
        ));
    }
}

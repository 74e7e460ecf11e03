//! Client file name handling.
//!
//! Client-supplied names are only ever used as a readable fragment of a storage key,
//! never as a path.

use crate::constants::MAX_KEY_NAME_LENGTH;

/// Lowercased extension of a file name, if it has one.
///
/// Only the last path component is considered, and a leading dot (`.bashrc`)
/// does not count as an extension.
pub fn file_extension(file_name: &str) -> Option<String> {
    let base = last_component(file_name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Reduce a client file name to a key-safe fragment.
///
/// Path separators are treated as component boundaries and only the last component
/// is kept. Control characters are dropped, anything outside `[A-Za-z0-9._-]`
/// becomes `_`, and leading dots are stripped so the result can never be `..`
/// or a hidden file. Falls back to `"file"` when nothing usable remains.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = last_component(file_name);

    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    let truncated: String = trimmed.chars().take(MAX_KEY_NAME_LENGTH).collect();
    let truncated = truncated.trim_end_matches('.');

    if truncated.is_empty() || truncated.chars().all(|c| c == '_') {
        return "file".to_string();
    }

    truncated.to_string()
}

fn last_component(file_name: &str) -> &str {
    file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
}

//! Validation modules

pub mod filename;
pub mod types;

pub use filename::{file_extension, sanitize_file_name};
pub use types::{normalize_mime_type, ReconciledType, TypeRule, TypeSignal, TypeTable};

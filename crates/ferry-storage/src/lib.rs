//! Ferry Storage Library
//!
//! This crate provides the storage abstraction artifacts are persisted through, and the
//! local filesystem implementation.
//!
//! # Storage key format
//!
//! Artifact keys are category-scoped:
//! `uploads/{category}/{yyyymmddThhmmssZ}_{sanitized_name}_{8 hex}`.
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so every writer produces the same layout.

pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use keys::generate_artifact_key;
pub use local::LocalStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};

//! Ferry Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration and
//! content-type reconciliation shared by every Ferry component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{FerryConfig, UploadLimits};
pub use error::{AppError, ErrorMetadata, LogLevel, UploadError, UploadErrorKind};
pub use models::{Artifact, MediaCategory, SessionState, UploadProgress, UploadSessionView};
pub use validation::{ReconciledType, TypeRule, TypeSignal, TypeTable};

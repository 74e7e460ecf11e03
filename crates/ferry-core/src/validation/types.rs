//! Content-type reconciliation.
//!
//! Clients and operating systems are unreliable about content types, so an upload is
//! judged on two signals: the declared content type and the file name extension. The
//! [`TypeTable`] maps each allowed content type to its category and plausible
//! extensions; [`TypeTable::reconcile`] is the single place that turns the two signals
//! into a trusted category.

use crate::error::UploadError;
use crate::models::MediaCategory;
use crate::validation::filename::file_extension;
use serde::Serialize;

/// One allowed content type together with its category and extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRule {
    pub content_type: String,
    pub category: MediaCategory,
    pub extensions: Vec<String>,
}

impl TypeRule {
    pub fn new(content_type: &str, category: MediaCategory, extensions: &[&str]) -> Self {
        Self {
            content_type: content_type.to_lowercase(),
            category,
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }
}

/// Which signal decided the reconciled type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeSignal {
    ContentType,
    Extension,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledType {
    pub content_type: String,
    pub category: MediaCategory,
    pub signal: TypeSignal,
}

/// Allow-list of content types and extensions per category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTable {
    rules: Vec<TypeRule>,
}

/// Normalize MIME type by stripping parameters (e.g. "image/jpeg; charset=utf-8" -> "image/jpeg").
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
        .to_lowercase()
}

impl TypeTable {
    pub fn new(rules: Vec<TypeRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[TypeRule] {
        &self.rules
    }

    /// Replace every rule of `category` with `rules`.
    pub fn set_category(&mut self, category: MediaCategory, rules: Vec<TypeRule>) {
        self.rules.retain(|rule| rule.category != category);
        self.rules.extend(rules);
    }

    /// Parse a category override of the form `type=ext|ext,type=ext`.
    ///
    /// A type with no `=` part is allowed without any extension.
    pub fn parse_category(category: MediaCategory, list: &str) -> Result<Vec<TypeRule>, anyhow::Error> {
        let mut rules = Vec::new();
        for entry in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (content_type, extensions) = match entry.split_once('=') {
                Some((ct, exts)) => (ct.trim(), exts),
                None => (entry, ""),
            };
            if !content_type.contains('/') {
                return Err(anyhow::anyhow!(
                    "Invalid content type '{}' in {} type table",
                    content_type,
                    category
                ));
            }
            let extensions: Vec<&str> = extensions
                .split('|')
                .map(|e| e.trim().trim_start_matches('.'))
                .filter(|e| !e.is_empty())
                .collect();
            rules.push(TypeRule::new(content_type, category, &extensions));
        }
        Ok(rules)
    }

    fn rule_for_content_type(&self, content_type: &str) -> Option<&TypeRule> {
        self.rules.iter().find(|rule| rule.content_type == content_type)
    }

    fn rule_for_extension(&self, extension: &str) -> Option<&TypeRule> {
        self.rules
            .iter()
            .find(|rule| rule.extensions.iter().any(|e| e == extension))
    }

    /// Resolve a trusted content type and category from the two client signals.
    ///
    /// The declared content type is tried first; when it is absent or not allowed, the
    /// file name extension is looked up instead. A file matching neither is rejected
    /// with `UnsupportedType`.
    pub fn reconcile(
        &self,
        declared_content_type: &str,
        file_name: &str,
    ) -> Result<ReconciledType, UploadError> {
        let normalized = normalize_mime_type(declared_content_type);
        let extension = file_extension(file_name);

        if let Some(rule) = self.rule_for_content_type(&normalized) {
            if let Some(ext_rule) = extension.as_deref().and_then(|e| self.rule_for_extension(e)) {
                if ext_rule.category != rule.category {
                    tracing::debug!(
                        content_type = %normalized,
                        extension = ?extension,
                        "Content type and extension disagree, trusting content type"
                    );
                }
            }
            return Ok(ReconciledType {
                content_type: rule.content_type.clone(),
                category: rule.category,
                signal: TypeSignal::ContentType,
            });
        }

        if let Some(rule) = extension.as_deref().and_then(|e| self.rule_for_extension(e)) {
            tracing::debug!(
                declared_content_type = %declared_content_type,
                extension = ?extension,
                reconciled = %rule.content_type,
                "Content type not allowed, accepted through extension"
            );
            return Ok(ReconciledType {
                content_type: rule.content_type.clone(),
                category: rule.category,
                signal: TypeSignal::Extension,
            });
        }

        Err(UploadError::unsupported_type(declared_content_type, file_name))
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        use MediaCategory::*;

        Self::new(vec![
            // Images
            TypeRule::new("image/jpeg", Images, &["jpg", "jpeg"]),
            TypeRule::new("image/png", Images, &["png"]),
            TypeRule::new("image/gif", Images, &["gif"]),
            TypeRule::new("image/webp", Images, &["webp"]),
            TypeRule::new("image/avif", Images, &["avif"]),
            TypeRule::new("image/bmp", Images, &["bmp"]),
            TypeRule::new("image/heic", Images, &["heic"]),
            // Documents
            TypeRule::new("application/pdf", Documents, &["pdf"]),
            TypeRule::new("application/msword", Documents, &["doc"]),
            TypeRule::new(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                Documents,
                &["docx"],
            ),
            TypeRule::new("application/vnd.ms-excel", Documents, &["xls"]),
            TypeRule::new(
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                Documents,
                &["xlsx"],
            ),
            TypeRule::new("application/vnd.ms-powerpoint", Documents, &["ppt"]),
            TypeRule::new(
                "application/vnd.openxmlformats-officedocument.presentationml.presentation",
                Documents,
                &["pptx"],
            ),
            TypeRule::new("text/plain", Documents, &["txt"]),
            TypeRule::new("text/csv", Documents, &["csv"]),
            // Video
            TypeRule::new("video/mp4", Video, &["mp4"]),
            TypeRule::new("video/webm", Video, &["webm"]),
            TypeRule::new("video/quicktime", Video, &["mov"]),
            TypeRule::new("video/x-msvideo", Video, &["avi"]),
            TypeRule::new("video/x-matroska", Video, &["mkv"]),
            TypeRule::new("video/x-m4v", Video, &["m4v"]),
            // Other
            TypeRule::new("application/zip", Other, &["zip"]),
            TypeRule::new("application/gzip", Other, &["gz"]),
            TypeRule::new("audio/mpeg", Other, &["mp3"]),
            TypeRule::new("audio/ogg", Other, &["ogg"]),
        ])
    }
}

//! Uploader identity.
//!
//! Authentication happens upstream: an authenticating proxy sets `x-user-id` to the
//! caller's id and the service trusts it.

use crate::error::HttpAppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ferry_core::AppError;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity of the caller, extracted from the trusted proxy header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploaderIdentity(pub Uuid);

impl<S> FromRequestParts<S> for UploaderIdentity
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("Missing {} header", USER_ID_HEADER)))?;

        let id = value
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .ok_or_else(|| {
                AppError::Unauthorized(format!("{} header is not a valid UUID", USER_ID_HEADER))
            })?;

        Ok(UploaderIdentity(id))
    }
}

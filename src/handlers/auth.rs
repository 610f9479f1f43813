//! Caller identification
//!
//! Requests identify their user with `Authorization: Bearer <token>`. The
//! token is used as an opaque key for per-user state; verifying it belongs
//! to whatever identity provider sits in front of this service.

use crate::error::AppError;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};

const BEARER_PREFIX: &str = "Bearer ";

/// Identified caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(String);

impl AuthenticatedUser {
    /// Opaque user key
    pub fn key(&self) -> &str {
        &self.0
    }

    fn from_header(value: Option<&str>) -> Result<Self, AppError> {
        let token = value
            .and_then(|v| v.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;
        Ok(Self(token.to_string()))
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        Self::from_header(header)
    }
}

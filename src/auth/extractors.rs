//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::{ApiAuthError, AuthErrorKind};

/// Member identity established by the authentication gate.
///
/// Only available on routes behind [`super::authenticate_member`]. Used
/// anywhere else it rejects as if the credentials were missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedMember(pub i64);

impl<S> FromRequestParts<S> for AuthenticatedMember
where
    S: Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedMember>()
            .copied()
            .ok_or_else(|| ApiAuthError::new(AuthErrorKind::CredentialsMissing))
    }
}

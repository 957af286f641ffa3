//! Authentication error types.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::cookie::clear_refresh_cookie;

/// Why the gate rejected a request. Only used for logging; every kind
/// produces the same 401 and clears the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Bearer header or refresh cookie absent
    CredentialsMissing,
    /// Tampered, forged or malformed token
    SignatureInvalid,
    /// Correctly signed but past its expiry
    TokenExpired,
    /// Signing or verification library failure
    UnexpectedFailure,
}

impl AuthErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorKind::CredentialsMissing => "credentials_missing",
            AuthErrorKind::SignatureInvalid => "signature_invalid",
            AuthErrorKind::TokenExpired => "token_expired",
            AuthErrorKind::UnexpectedFailure => "unexpected_failure",
        }
    }
}

/// API authentication error (returns JSON, blanks the bearer header and
/// clears the refresh cookie).
#[derive(Debug)]
pub struct ApiAuthError {
    pub kind: AuthErrorKind,
}

impl ApiAuthError {
    pub fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::CredentialsMissing => "Token not found",
            AuthErrorKind::SignatureInvalid
            | AuthErrorKind::TokenExpired
            | AuthErrorKind::UnexpectedFailure => "Invalid or expired token",
        }
    }
}

impl From<AuthErrorKind> for ApiAuthError {
    fn from(kind: AuthErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Blank the `Authorization` header and expire the refresh cookie.
pub fn clear_session(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static(""));
    if let Ok(value) = HeaderValue::from_str(&clear_refresh_cookie()) {
        headers.append(header::SET_COOKIE, value);
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: &'static str,
        }

        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                message: self.message(),
            }),
        )
            .into_response();

        clear_session(&mut response);
        response
    }
}

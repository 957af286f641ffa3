//! Authentication gate for protected routes.
//!
//! Every protected request needs both a bearer access token and the
//! refresh cookie. The refresh token is the only source of identity: the
//! incoming access token is required to be present but is never decoded.
//! A fresh access token bound to the refresh token's member is minted on
//! every successful pass and returned in the `Authorization` header.
//!
//! Flow: presence check -> refresh verification -> rotation -> access
//! verification -> downstream handler. Any failure rejects with 401 and
//! clears the session.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::cookie::{REFRESH_COOKIE_NAME, bearer_token, bearer_value, get_cookie};
use super::errors::{ApiAuthError, AuthErrorKind};
use super::extractors::AuthenticatedMember;
use crate::jwt::{JwtConfig, JwtError};

/// Outcome of a successful pass through the gate.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// Member identity derived from the refresh token
    pub member_id: i64,
    /// Newly minted access token for the response
    pub access_token: String,
}

impl From<JwtError> for AuthErrorKind {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Expired => AuthErrorKind::TokenExpired,
            JwtError::InvalidSignature(_) | JwtError::WrongTokenType => {
                AuthErrorKind::SignatureInvalid
            }
            JwtError::Encoding(_) | JwtError::TimeError => AuthErrorKind::UnexpectedFailure,
        }
    }
}

/// Run the gate against the request headers.
pub fn authenticate(jwt: &JwtConfig, headers: &HeaderMap) -> Result<Authenticated, AuthErrorKind> {
    let (Some(_access_token), Some(refresh_token)) = (
        bearer_token(headers),
        get_cookie(headers, REFRESH_COOKIE_NAME),
    ) else {
        return Err(AuthErrorKind::CredentialsMissing);
    };

    let refresh_claims = jwt.validate_refresh_token(refresh_token)?;

    let access = jwt
        .generate_access_token(refresh_claims.member_id)
        .map_err(|e| {
            warn!(error = %e, "Failed to generate access token");
            AuthErrorKind::UnexpectedFailure
        })?;

    let access_claims = jwt.validate_access_token(&access.token).map_err(|e| {
        warn!(error = %e, "Freshly minted access token did not verify");
        AuthErrorKind::UnexpectedFailure
    })?;

    Ok(Authenticated {
        member_id: access_claims.member_id,
        access_token: access.token,
    })
}

/// Middleware guarding protected routes.
///
/// On success the member identity is attached to the request and the
/// rotated access token is set on the handler's response. On failure the
/// handler is never run.
pub async fn authenticate_member(
    State(jwt): State<Arc<JwtConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    let authenticated = match authenticate(&jwt, request.headers()) {
        Ok(authenticated) => authenticated,
        Err(kind) => {
            warn!(
                kind = kind.as_str(),
                path = %request.uri().path(),
                "Rejected request"
            );
            return ApiAuthError::new(kind).into_response();
        }
    };

    debug!(member_id = authenticated.member_id, "Authenticated request");

    let header_value = match HeaderValue::from_str(&bearer_value(&authenticated.access_token)) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Access token is not a valid header value");
            return ApiAuthError::new(AuthErrorKind::UnexpectedFailure).into_response();
        }
    };

    request
        .extensions_mut()
        .insert(AuthenticatedMember(authenticated.member_id));

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::AUTHORIZATION, header_value);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::{REFRESH_TOKEN_DURATION_SECS, TokenType};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn headers(access: Option<&str>, refresh: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(access) = access {
            headers.insert(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", access)).unwrap(),
            );
        }
        if let Some(refresh) = refresh {
            headers.insert(
                header::COOKIE,
                HeaderValue::from_str(&format!("refreshToken={}", refresh)).unwrap(),
            );
        }
        headers
    }

    #[test]
    fn test_missing_header_rejected() {
        let jwt = JwtConfig::new(b"gate-secret");
        let refresh = jwt.generate_refresh_token(1).unwrap().token;

        let result = authenticate(&jwt, &headers(None, Some(&refresh)));
        assert_eq!(result.unwrap_err(), AuthErrorKind::CredentialsMissing);
    }

    #[test]
    fn test_missing_cookie_rejected() {
        let jwt = JwtConfig::new(b"gate-secret");
        let access = jwt.generate_access_token(1).unwrap().token;

        let result = authenticate(&jwt, &headers(Some(&access), None));
        assert_eq!(result.unwrap_err(), AuthErrorKind::CredentialsMissing);
    }

    #[test]
    fn test_identity_comes_from_refresh_token() {
        let jwt = JwtConfig::new(b"gate-secret");
        let access = jwt.generate_access_token(99).unwrap().token;
        let refresh = jwt.generate_refresh_token(42).unwrap().token;

        let result = authenticate(&jwt, &headers(Some(&access), Some(&refresh))).unwrap();
        assert_eq!(result.member_id, 42);
        assert_ne!(result.access_token, access);

        let claims = jwt.validate_access_token(&result.access_token).unwrap();
        assert_eq!(claims.member_id, 42);
    }

    #[test]
    fn test_expired_refresh_token_rejected() {
        let jwt = JwtConfig::new(b"gate-secret");
        let access = jwt.generate_access_token(1).unwrap().token;
        let refresh = jwt
            .issue_at(1, TokenType::Refresh, now() - 2 * REFRESH_TOKEN_DURATION_SECS)
            .unwrap()
            .token;

        let result = authenticate(&jwt, &headers(Some(&access), Some(&refresh)));
        assert_eq!(result.unwrap_err(), AuthErrorKind::TokenExpired);
    }

    #[test]
    fn test_forged_refresh_token_rejected() {
        let jwt = JwtConfig::new(b"gate-secret");
        let forger = JwtConfig::new(b"other-secret");
        let access = jwt.generate_access_token(1).unwrap().token;
        let refresh = forger.generate_refresh_token(1).unwrap().token;

        let result = authenticate(&jwt, &headers(Some(&access), Some(&refresh)));
        assert_eq!(result.unwrap_err(), AuthErrorKind::SignatureInvalid);
    }

    #[test]
    fn test_access_token_in_cookie_rejected() {
        let jwt = JwtConfig::new(b"gate-secret");
        let access = jwt.generate_access_token(1).unwrap().token;

        let result = authenticate(&jwt, &headers(Some(&access), Some(&access)));
        assert_eq!(result.unwrap_err(), AuthErrorKind::SignatureInvalid);
    }
}

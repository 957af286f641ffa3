//! Session issuance for sign-up, login and password reset.

use axum::http::{HeaderName, header};
use axum::response::AppendHeaders;

use super::cookie::{bearer_value, clear_refresh_cookie, refresh_cookie};
use crate::jwt::{JwtConfig, JwtError};

/// Response headers that start a session.
pub type SessionHeaders = AppendHeaders<[(HeaderName, String); 2]>;

/// Mint an access and refresh token pair for a member and return the
/// `Authorization` and `Set-Cookie` headers that deliver them.
pub fn start_session(jwt: &JwtConfig, member_id: i64) -> Result<SessionHeaders, JwtError> {
    let access = jwt.generate_access_token(member_id)?;
    let refresh = jwt.generate_refresh_token(member_id)?;

    Ok(AppendHeaders([
        (header::AUTHORIZATION, bearer_value(&access.token)),
        (header::SET_COOKIE, refresh_cookie(&refresh.token)),
    ]))
}

/// Headers that end a session.
pub fn end_session() -> SessionHeaders {
    AppendHeaders([
        (header::AUTHORIZATION, String::new()),
        (header::SET_COOKIE, clear_refresh_cookie()),
    ])
}

//! Cookie and bearer-header helpers for the session contract.

use axum::http::{HeaderMap, header};

use crate::jwt::REFRESH_TOKEN_DURATION_SECS;

/// Cookie name for the refresh token (long-lived, 7 days).
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

const BEARER_PREFIX: &str = "Bearer ";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                let value = value.trim();
                return (!value.is_empty()).then_some(value);
            }
        }
    }
    None
}

/// Extract the token from an `Authorization: Bearer <token>` header.
/// A blank token counts as absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

/// Format a token as an `Authorization` header value.
pub fn bearer_value(token: &str) -> String {
    format!("{}{}", BEARER_PREFIX, token)
}

/// `Set-Cookie` value carrying a freshly minted refresh token.
pub fn refresh_cookie(token: &str) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age={}",
        REFRESH_COOKIE_NAME, token, REFRESH_TOKEN_DURATION_SECS
    )
}

/// `Set-Cookie` value that removes the refresh token from the browser.
pub fn clear_refresh_cookie() -> String {
    format!(
        "{}=; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age=0",
        REFRESH_COOKIE_NAME
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_cookie_multiple() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; refreshToken=xyz789; theme=dark"),
        );

        assert_eq!(get_cookie(&headers, "refreshToken"), Some("xyz789"));
        assert_eq!(get_cookie(&headers, "foo"), Some("bar"));
    }

    #[test]
    fn test_get_cookie_not_found() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("foo=bar"));

        assert_eq!(get_cookie(&headers, REFRESH_COOKIE_NAME), None);
        assert_eq!(get_cookie(&HeaderMap::new(), REFRESH_COOKIE_NAME), None);
    }

    #[test]
    fn test_get_cookie_empty_value_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("refreshToken="));

        assert_eq!(get_cookie(&headers, REFRESH_COOKIE_NAME), None);
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(""));
        assert_eq!(bearer_token(&headers), None);

        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_refresh_cookie_attributes() {
        let cookie = refresh_cookie("tok");
        assert!(cookie.starts_with("refreshToken=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=604800"));

        let cleared = clear_refresh_cookie();
        assert!(cleared.starts_with("refreshToken=;"));
        assert!(cleared.contains("Max-Age=0"));
    }
}

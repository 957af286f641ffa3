//! Rate limiting for sign-up, login and password-reset endpoints.
//!
//! Uses a token bucket per client IP to slow down credential stuffing.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use serde_json::json;
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc};
use tracing::warn;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Key shared by requests that carry no connection info (in-process tests).
const UNKNOWN_CLIENT: &str = "unknown";

/// Default requests per minute per IP on the credential endpoints.
pub const DEFAULT_AUTH_PER_MINUTE: u32 = 10;

#[derive(Clone)]
pub struct RateLimitConfig {
    /// Shared by sign-up, login and password reset
    pub auth: Arc<IpLimiter>,
}

impl RateLimitConfig {
    /// Create a limiter allowing `per_minute` requests per IP. Zero is
    /// treated as one.
    pub fn new(per_minute: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN));
        Self {
            auth: Arc::new(RateLimiter::keyed(quota)),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_AUTH_PER_MINUTE)
    }
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Middleware for rate limiting credential endpoints.
pub async fn rate_limit_auth(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_key(&request);

    match config.auth.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            warn!(ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "message": "Too many requests. Please try again later." })),
            )
                .into_response()
        }
    }
}

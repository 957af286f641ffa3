//! JWT authentication for protected API routes.
//!
//! Dual-token system: short-lived access tokens (1 hour, bearer header)
//! and long-lived refresh tokens (7 days, HTTP-only cookie). Both are
//! stateless; the gate re-derives identity from the refresh token and
//! rotates the access token on every authenticated request.

mod cookie;
mod errors;
mod extractors;
mod gate;
mod session;

pub use cookie::{
    REFRESH_COOKIE_NAME, bearer_token, bearer_value, clear_refresh_cookie, get_cookie,
    refresh_cookie,
};
pub use errors::{ApiAuthError, AuthErrorKind, clear_session};
pub use extractors::AuthenticatedMember;
pub use gate::{Authenticated, authenticate, authenticate_member};
pub use session::{SessionHeaders, end_session, start_session};

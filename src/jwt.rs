//! JWT token generation and validation.
//!
//! Every token kind is HS256-signed with the same secret. The `typ` claim
//! keeps the kinds apart so a refresh token can never stand in for an
//! access token (or a password-reset token for either).

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Token type for distinguishing the token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token (1 hour), sent as a bearer header
    Access,
    /// Long-lived refresh token (7 days), carried in an HTTP-only cookie
    Refresh,
    /// Single-purpose token for the password reset confirmation link
    PasswordReset,
}

impl TokenType {
    pub fn duration_secs(self) -> u64 {
        match self {
            TokenType::Access => ACCESS_TOKEN_DURATION_SECS,
            TokenType::Refresh => REFRESH_TOKEN_DURATION_SECS,
            TokenType::PasswordReset => PASSWORD_RESET_TOKEN_DURATION_SECS,
        }
    }
}

/// JWT claims shared by all token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Member the token was issued to
    #[serde(rename = "memberId")]
    pub member_id: i64,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Random token ID, makes every minted token unique
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Access token duration: 1 hour
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 60 * 60;

/// Refresh token duration: 7 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Password reset token duration: 1 hour
pub const PASSWORD_RESET_TOKEN_DURATION_SECS: u64 = 60 * 60;

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

/// Result of minting a token.
#[derive(Debug, Clone)]
pub struct TokenResult {
    /// The JWT token string
    pub token: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

fn now_secs() -> Result<u64, JwtError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| JwtError::TimeError)?
        .as_secs())
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Generate an access token for a member (1 hour).
    pub fn generate_access_token(&self, member_id: i64) -> Result<TokenResult, JwtError> {
        self.issue_at(member_id, TokenType::Access, now_secs()?)
    }

    /// Generate a refresh token for a member (7 days).
    pub fn generate_refresh_token(&self, member_id: i64) -> Result<TokenResult, JwtError> {
        self.issue_at(member_id, TokenType::Refresh, now_secs()?)
    }

    /// Generate a password reset token for a member (1 hour).
    pub fn generate_password_reset_token(&self, member_id: i64) -> Result<TokenResult, JwtError> {
        self.issue_at(member_id, TokenType::PasswordReset, now_secs()?)
    }

    /// Mint a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        member_id: i64,
        token_type: TokenType,
        now: u64,
    ) -> Result<TokenResult, JwtError> {
        let duration = token_type.duration_secs();
        let claims = Claims {
            member_id,
            token_type,
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + duration,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(TokenResult {
            token,
            issued_at: now,
            expires_at: claims.exp,
            duration,
        })
    }

    /// Check signature and expiry of any token kind.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::InvalidSignature(e),
            })?;

        Ok(token_data.claims)
    }

    /// Validate and decode an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_kind(token, TokenType::Access)
    }

    /// Validate and decode a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_kind(token, TokenType::Refresh)
    }

    /// Validate and decode a password reset token.
    pub fn validate_password_reset_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_kind(token, TokenType::PasswordReset)
    }

    fn validate_kind(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let claims = self.verify(token)?;
        if claims.token_type != expected {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Signature mismatch, malformed token or unexpected algorithm
    InvalidSignature(jsonwebtoken::errors::Error),
    /// Correctly signed but past its expiry
    Expired,
    /// System time error
    TimeError,
    /// Wrong token type (e.g., using refresh token as access token)
    WrongTokenType,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::InvalidSignature(e) => write!(f, "Invalid token: {}", e),
            JwtError::Expired => write!(f, "Token expired"),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::WrongTokenType => write!(f, "Wrong token type"),
        }
    }
}

impl std::error::Error for JwtError {}

//! Password hashing and verification using Argon2id.
//!
//! Hashes are stored in PHC string format, which embeds the algorithm,
//! parameters and salt.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Errors from hashing or verifying a password.
#[derive(Debug)]
pub enum PasswordError {
    /// Hashing failed
    Hashing(String),
    /// Stored hash is not a valid PHC string
    InvalidHashFormat,
    /// Verification failed for a reason other than a mismatch
    Verification(String),
}

impl std::fmt::Display for PasswordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PasswordError::Hashing(e) => write!(f, "Failed to hash password: {}", e),
            PasswordError::InvalidHashFormat => write!(f, "Invalid password hash format"),
            PasswordError::Verification(e) => write!(f, "Failed to verify password: {}", e),
        }
    }
}

impl std::error::Error for PasswordError {}

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hashing(e.to_string()))?;

    Ok(hash.to_string())
}

/// Check a plaintext password against a stored hash.
/// Returns `Ok(false)` on mismatch.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Verification(e.to_string())),
    }
}

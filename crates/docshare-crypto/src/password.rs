//! Password hashing and validation.
//!
//! bcrypt is CPU-bound by design; async callers should run these functions
//! on a blocking thread pool.

use crate::error::{CryptoError, CryptoResult};

/// Maximum password length (bcrypt only reads the first 72 bytes).
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Check a candidate password against length bounds.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidPassword`] if the password is shorter than
/// `min_length` characters or longer than [`MAX_PASSWORD_LENGTH`] bytes.
pub fn validate_password(password: &str, min_length: usize) -> CryptoResult<()> {
    if password.chars().count() < min_length {
        return Err(CryptoError::InvalidPassword(format!(
            "must be at least {min_length} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(CryptoError::InvalidPassword(format!(
            "must be at most {MAX_PASSWORD_LENGTH} bytes"
        )));
    }
    Ok(())
}

/// Hash a password with bcrypt at the given cost.
///
/// # Errors
///
/// Returns [`CryptoError::PasswordHash`] if bcrypt rejects the cost or fails.
pub fn hash_password(password: &str, cost: u32) -> CryptoResult<String> {
    bcrypt::hash(password, cost).map_err(|e| CryptoError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored bcrypt hash.
///
/// Returns `Ok(false)` for a well-formed hash that does not match.
///
/// # Errors
///
/// Returns [`CryptoError::PasswordHash`] if the stored hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> CryptoResult<bool> {
    bcrypt::verify(password, hash).map_err(|e| CryptoError::PasswordHash(e.to_string()))
}

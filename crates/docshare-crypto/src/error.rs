//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Secret key too short or too long.
    #[error("invalid key length: expected {min}..={max} bytes, got {actual}")]
    InvalidKeyLength {
        /// Minimum accepted length in bytes.
        min: usize,
        /// Maximum accepted length in bytes.
        max: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Unknown signing algorithm name.
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Invalid hex encoding.
    #[error("invalid hex encoding")]
    InvalidHexEncoding,

    /// Invalid base64 encoding.
    #[error("invalid base64 encoding")]
    InvalidBase64Encoding,

    /// Password rejected before hashing.
    #[error("invalid password: {0}")]
    InvalidPassword(String),

    /// bcrypt failed to hash or parse a stored hash.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    /// I/O error (e.g. reading/writing key files).
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

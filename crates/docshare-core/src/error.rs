//! Core error types.

use thiserror::Error;

/// Errors raised while parsing or constructing core values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// An identifier string was not a non-negative integer.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Unknown role name.
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// A timestamp fell outside the representable range.
    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(i64),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

//! Error types for the gateway.
//!
//! Every variant carries a status code and a client-safe message. Internal
//! details (storage paths, token failure kinds, bcrypt errors) go to the
//! logs, never into [`GatewayError::public_message`].

use docshare_capabilities::{TokenError, TokenPurpose};
use docshare_crypto::CryptoError;
use docshare_storage::StorageError;
use thiserror::Error;
use tracing::{debug, warn};

/// Message returned for every rejected capability token.
pub const ACCESS_DENIED: &str = "Access denied";

/// Message returned for every failed bearer authentication.
pub const INVALID_CREDENTIALS: &str = "Could not validate credentials";

const INTERNAL: &str = "Internal server error";

/// Gateway error type.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request itself is unacceptable (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The bearer credential is missing or invalid (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller may not perform this operation (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The target does not exist (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// A capability token was rejected.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Key material or password hashing failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The service could not be assembled from configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP-style status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Token(e) if e.is_invalid_token() => 403,
            Self::Token(TokenError::SubjectMismatch { .. }) => 403,
            Self::Token(_)
            | Self::Storage(_)
            | Self::Crypto(_)
            | Self::Config(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Message safe to return to the client.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::BadRequest(m) | Self::Unauthorized(m) | Self::Forbidden(m) | Self::NotFound(m) => {
                m.clone()
            },
            Self::Token(TokenError::SubjectMismatch { .. }) => {
                "Token is not valid for this user.".to_owned()
            },
            Self::Token(e) if e.is_invalid_token() => ACCESS_DENIED.to_owned(),
            Self::Token(_)
            | Self::Storage(_)
            | Self::Crypto(_)
            | Self::Config(_)
            | Self::Internal(_) => INTERNAL.to_owned(),
        }
    }

    /// Stable short label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Token(e) => e.kind(),
            Self::Storage(_) => "storage",
            Self::Crypto(_) => "crypto",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether this is a server-side failure rather than a client mistake.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status() >= 500
    }
}

/// Log why a `purpose` token was rejected.
///
/// Expiry is routine and logged at `debug`; a forged or garbled token is
/// logged at `warn`.
pub(crate) fn log_rejection(purpose: TokenPurpose, err: &TokenError) {
    match err {
        TokenError::Expired { expired_at } => {
            debug!(%purpose, kind = err.kind(), %expired_at, "token rejected");
        },
        _ => warn!(%purpose, kind = err.kind(), error = %err, "token rejected"),
    }
}

/// Log a rejected `purpose` token and wrap the failure.
pub(crate) fn reject_token(purpose: TokenPurpose, err: TokenError) -> GatewayError {
    log_rejection(purpose, &err);
    GatewayError::Token(err)
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

//! Token error types.

use docshare_core::{Timestamp, UserId};
use thiserror::Error;

/// Errors from issuing, verifying or binding a capability token.
///
/// The first three variants form the "token invalid" category and are what
/// [`CapabilityIssuer::verify`](crate::CapabilityIssuer::verify) can return.
/// None of them is transient; retrying with the same token never helps.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Not decodable as a signed envelope carrying a claim.
    #[error("malformed token: {reason}")]
    Malformed {
        /// What failed to decode.
        reason: String,
    },

    /// The signature does not match the payload under the current key.
    #[error("token signature invalid")]
    BadSignature,

    /// Signature valid, but the expiry has passed.
    #[error("token expired at {expired_at}")]
    Expired {
        /// When the claim stopped being valid.
        expired_at: Timestamp,
    },

    /// Valid token presented by someone other than its subject.
    #[error("token subject {subject} does not match caller {caller}")]
    SubjectMismatch {
        /// Subject named in the claim.
        subject: UserId,
        /// Authenticated caller.
        caller: UserId,
    },

    /// Issuance asked for a lifetime under one second.
    #[error("token ttl must be at least 1s, got {seconds}s")]
    InvalidTtl {
        /// Requested lifetime in seconds.
        seconds: i64,
    },

    /// The envelope could not be produced.
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl TokenError {
    /// Whether this is one of the verification failures (malformed, bad
    /// signature, expired).
    #[must_use]
    pub fn is_invalid_token(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. } | Self::BadSignature | Self::Expired { .. }
        )
    }

    /// Stable short label for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "malformed",
            Self::BadSignature => "bad_signature",
            Self::Expired { .. } => "expired",
            Self::SubjectMismatch { .. } => "subject_mismatch",
            Self::InvalidTtl { .. } => "invalid_ttl",
            Self::Signing(_) => "signing",
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Result type for token operations.
pub type TokenResult<T> = Result<T, TokenError>;

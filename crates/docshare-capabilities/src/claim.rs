//! The claim a capability token carries.

use chrono::Duration;
use docshare_core::{FileId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{TokenError, TokenResult};

/// A `(subject, resource, expiry)` binding.
///
/// Never persisted; it only exists inside a signed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Claim {
    /// User the capability is granted to.
    pub subject_id: UserId,
    /// File the capability covers, or [`FileId::NONE`].
    pub resource_id: FileId,
    /// Instant after which the claim is invalid (whole seconds).
    pub expires_at: Timestamp,
}

impl Claim {
    /// Check that the authenticated caller is this claim's subject.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::SubjectMismatch`] when they differ.
    pub fn ensure_subject(&self, caller: UserId) -> TokenResult<()> {
        if self.subject_id == caller {
            Ok(())
        } else {
            Err(TokenError::SubjectMismatch {
                subject: self.subject_id,
                caller,
            })
        }
    }

    /// Whether the claim targets a specific file.
    #[must_use]
    pub fn is_resource_scoped(&self) -> bool {
        !self.resource_id.is_none()
    }

    /// Whether the claim is expired at `now`, tolerating `leeway` of clock skew.
    ///
    /// `now` is compared in whole seconds, like `expires_at`, so the claim
    /// stays valid while `floor(now) <= expires_at + leeway`.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp, leeway: Duration) -> bool {
        match self.expires_at.checked_add(leeway) {
            Some(deadline) => now.truncated_to_seconds() > deadline,
            None => false,
        }
    }
}

/// The claim as it appears in the token payload.
///
/// Field names are a wire contract: `sub` is the subject id as a decimal
/// string, `file_id` the resource id, `exp` UNIX seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireClaims {
    /// Subject id, decimal string.
    pub sub: String,
    /// Resource id (0 when not file-scoped).
    pub file_id: u64,
    /// Expiry, UNIX seconds.
    pub exp: i64,
}

impl From<&Claim> for WireClaims {
    fn from(claim: &Claim) -> Self {
        Self {
            sub: claim.subject_id.to_string(),
            file_id: claim.resource_id.get(),
            exp: claim.expires_at.unix_seconds(),
        }
    }
}

impl TryFrom<WireClaims> for Claim {
    type Error = TokenError;

    fn try_from(wire: WireClaims) -> TokenResult<Self> {
        let subject_id = wire
            .sub
            .parse::<UserId>()
            .map_err(|e| TokenError::malformed(format!("sub: {e}")))?;
        let expires_at = Timestamp::from_unix_seconds(wire.exp)
            .map_err(|e| TokenError::malformed(format!("exp: {e}")))?;
        Ok(Self {
            subject_id,
            resource_id: FileId(wire.file_id),
            expires_at,
        })
    }
}

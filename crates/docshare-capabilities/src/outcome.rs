//! Tagged verification outcome.

use docshare_core::Timestamp;

use crate::claim::Claim;
use crate::error::{TokenError, TokenResult};

/// Result of checking a presented token, as a single tagged value.
///
/// Exactly one of these holds for any input string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Signature good and not expired.
    Valid(Claim),
    /// Not a decodable envelope.
    Malformed,
    /// Decodable, but the signature does not match.
    BadSignature,
    /// Signature good, expiry passed.
    Expired {
        /// When the claim stopped being valid.
        expired_at: Timestamp,
    },
}

impl VerifyOutcome {
    /// Whether the token was accepted.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// The claim, if the token was accepted.
    #[must_use]
    pub fn claim(&self) -> Option<&Claim> {
        match self {
            Self::Valid(claim) => Some(claim),
            _ => None,
        }
    }

    /// Convert back to a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the matching [`TokenError`] for every non-valid outcome.
    pub fn into_result(self) -> TokenResult<Claim> {
        match self {
            Self::Valid(claim) => Ok(claim),
            Self::Malformed => Err(TokenError::malformed("undecodable token")),
            Self::BadSignature => Err(TokenError::BadSignature),
            Self::Expired { expired_at } => Err(TokenError::Expired { expired_at }),
        }
    }
}

impl From<TokenResult<Claim>> for VerifyOutcome {
    fn from(result: TokenResult<Claim>) -> Self {
        match result {
            Ok(claim) => Self::Valid(claim),
            Err(TokenError::BadSignature) => Self::BadSignature,
            Err(TokenError::Expired { expired_at }) => Self::Expired { expired_at },
            // verify never yields the binding or issuance errors; anything
            // unexpected is treated as undecodable.
            Err(_) => Self::Malformed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docshare_core::{FileId, UserId};

    #[test]
    fn test_from_result() {
        let claim = Claim {
            subject_id: UserId(1),
            resource_id: FileId(2),
            expires_at: Timestamp::from_unix_seconds(3).unwrap(),
        };
        assert_eq!(VerifyOutcome::from(Ok(claim)), VerifyOutcome::Valid(claim));
        assert_eq!(
            VerifyOutcome::from(Err(TokenError::BadSignature)),
            VerifyOutcome::BadSignature
        );
        assert_eq!(
            VerifyOutcome::from(Err(TokenError::malformed("x"))),
            VerifyOutcome::Malformed
        );
        assert!(VerifyOutcome::Valid(claim).is_valid());
        assert_eq!(VerifyOutcome::Valid(claim).claim(), Some(&claim));
    }

    #[test]
    fn test_into_result() {
        let expired_at = Timestamp::from_unix_seconds(10).unwrap();
        assert_eq!(
            VerifyOutcome::Expired { expired_at }.into_result(),
            Err(TokenError::Expired { expired_at })
        );
        assert!(matches!(
            VerifyOutcome::Malformed.into_result(),
            Err(TokenError::Malformed { .. })
        ));
    }
}

//! Purpose-scoped token issuance.
//!
//! The service mints three kinds of token from one configured secret: email
//! verification links, download links and session bearers. Each purpose
//! signs under its own key derived from the master secret, so a token minted
//! for one purpose never verifies as another even though all three share the
//! same payload shape.

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use docshare_core::{FileId, UserId};
use docshare_crypto::KeyId;

use crate::claim::Claim;
use crate::clock::Clock;
use crate::error::TokenResult;
use crate::issuer::{CapabilityIssuer, IssuedToken, TokenConfig};

/// What a token is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenPurpose {
    /// One-time style link proving control of an email address.
    EmailVerification,
    /// Short-lived link to fetch one file.
    Download,
    /// Bearer credential returned by login.
    Session,
}

impl TokenPurpose {
    /// All purposes.
    pub const ALL: [Self; 3] = [Self::EmailVerification, Self::Download, Self::Session];

    /// Key-derivation context for this purpose.
    #[must_use]
    pub fn derive_context(self) -> &'static str {
        match self {
            Self::EmailVerification => "docshare 2024 token email-verification",
            Self::Download => "docshare 2024 token download",
            Self::Session => "docshare 2024 token session",
        }
    }

    /// Short label for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::Download => "download",
            Self::Session => "session",
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifetime of each kind of token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    /// Email verification links.
    pub email_verification: Duration,
    /// Download links.
    pub download: Duration,
    /// Session bearers.
    pub session: Duration,
}

impl TtlPolicy {
    /// Lifetime for `purpose`.
    #[must_use]
    pub fn for_purpose(&self, purpose: TokenPurpose) -> Duration {
        match purpose {
            TokenPurpose::EmailVerification => self.email_verification,
            TokenPurpose::Download => self.download,
            TokenPurpose::Session => self.session,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            email_verification: Duration::hours(24),
            download: Duration::minutes(15),
            session: Duration::minutes(30),
        }
    }
}

/// One [`CapabilityIssuer`] per [`TokenPurpose`], all derived from a single
/// master secret.
#[derive(Clone)]
pub struct TokenAuthority {
    email_verification: CapabilityIssuer,
    download: CapabilityIssuer,
    session: CapabilityIssuer,
    ttl: TtlPolicy,
}

impl TokenAuthority {
    /// Derive the per-purpose issuers from `config`.
    #[must_use]
    pub fn new(config: &TokenConfig, ttl: TtlPolicy) -> Self {
        let issuer_for = |purpose: TokenPurpose| {
            let derived = TokenConfig {
                secret: config.secret.derive(purpose.derive_context()),
                ..config.clone()
            };
            CapabilityIssuer::new(derived)
        };

        Self {
            email_verification: issuer_for(TokenPurpose::EmailVerification),
            download: issuer_for(TokenPurpose::Download),
            session: issuer_for(TokenPurpose::Session),
            ttl,
        }
    }

    /// Replace the time source on every issuer.
    #[must_use]
    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        Self {
            email_verification: self.email_verification.with_clock(clock.clone()),
            download: self.download.with_clock(clock.clone()),
            session: self.session.with_clock(clock),
            ttl: self.ttl,
        }
    }

    /// The issuer for `purpose`.
    #[must_use]
    pub fn issuer(&self, purpose: TokenPurpose) -> &CapabilityIssuer {
        match purpose {
            TokenPurpose::EmailVerification => &self.email_verification,
            TokenPurpose::Download => &self.download,
            TokenPurpose::Session => &self.session,
        }
    }

    /// Configured lifetimes.
    #[must_use]
    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    /// Fingerprint of the key used for `purpose`.
    #[must_use]
    pub fn key_id(&self, purpose: TokenPurpose) -> KeyId {
        self.issuer(purpose).key_id()
    }

    /// Mint a `purpose` token with the policy lifetime.
    ///
    /// # Errors
    ///
    /// See [`CapabilityIssuer::issue`].
    pub fn issue(
        &self,
        purpose: TokenPurpose,
        subject: UserId,
        resource: FileId,
    ) -> TokenResult<IssuedToken> {
        self.issuer(purpose)
            .issue(subject, resource, self.ttl.for_purpose(purpose))
    }

    /// Verify a token as a `purpose` token.
    ///
    /// # Errors
    ///
    /// See [`CapabilityIssuer::verify`]. A token minted for another purpose
    /// fails with [`TokenError::BadSignature`](crate::TokenError::BadSignature).
    pub fn verify(&self, purpose: TokenPurpose, token: &str) -> TokenResult<Claim> {
        self.issuer(purpose).verify(token)
    }
}

impl fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("email_verification", &self.email_verification.key_id())
            .field("download", &self.download.key_id())
            .field("session", &self.session.key_id())
            .field("ttl", &self.ttl)
            .finish()
    }
}

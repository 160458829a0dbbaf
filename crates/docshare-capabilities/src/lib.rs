//! Docshare Capabilities - Signed, expiring capability tokens.
//!
//! This crate provides:
//! - [`Claim`]: the `(subject, resource, expiry)` binding a token carries
//! - [`CapabilityIssuer`]: mints and verifies tokens under one signing key
//! - [`TokenAuthority`]: one issuer per [`TokenPurpose`], each with its own
//!   derived key so a token minted for one flow never verifies in another
//! - [`TokenError`] / [`VerifyOutcome`]: the failure taxonomy
//!
//! # Security Model
//!
//! Every token is:
//! - HMAC-signed with a server-held secret (JWS compact form)
//! - Time-bounded by an absolute `exp`
//! - Self-contained: nothing about issued tokens is stored server-side
//!
//! Consequences worth knowing:
//! - Tokens are **not single-use**. A token verifies on every request until
//!   it expires.
//! - There is **no revocation**. A leaked, unexpired token stays valid until
//!   `exp`; the only way to cut every token off early is to rotate the secret.
//! - The issuer does not know who is calling. After [`CapabilityIssuer::verify`]
//!   succeeds the caller must still run [`Claim::ensure_subject`].
//!
//! # Example
//!
//! ```
//! use chrono::Duration;
//! use docshare_capabilities::{CapabilityIssuer, TokenConfig};
//! use docshare_core::{FileId, UserId};
//! use docshare_crypto::SigningSecret;
//!
//! let issuer = CapabilityIssuer::new(TokenConfig::new(SigningSecret::generate()));
//!
//! let issued = issuer
//!     .issue(UserId(42), FileId(7), Duration::minutes(15))
//!     .unwrap();
//!
//! let claim = issuer.verify(issued.as_str()).unwrap();
//! assert_eq!(claim.subject_id, UserId(42));
//! assert_eq!(claim.resource_id, FileId(7));
//! assert!(claim.ensure_subject(UserId(42)).is_ok());
//! assert!(claim.ensure_subject(UserId(43)).is_err());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod authority;
mod claim;
mod clock;
mod error;
mod issuer;
mod outcome;

pub use authority::{TokenAuthority, TokenPurpose, TtlPolicy};
pub use claim::{Claim, WireClaims};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{TokenError, TokenResult};
pub use issuer::{CapabilityIssuer, IssuedToken, TokenConfig};
pub use outcome::VerifyOutcome;

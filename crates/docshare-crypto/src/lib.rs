//! Docshare Crypto - Key material and password primitives.
//!
//! This crate provides:
//! - [`SigningSecret`]: the symmetric HMAC key used to sign capability tokens,
//!   zeroized on drop and never printed
//! - [`SigningAlgorithm`]: the fixed HMAC-SHA2 variant tokens are signed with
//! - [`KeyId`]: a short BLAKE3-derived fingerprint for logging which key is in use
//! - bcrypt password hashing and verification
//!
//! # Example
//!
//! ```
//! use docshare_crypto::{SigningAlgorithm, SigningSecret};
//!
//! let secret = SigningSecret::generate();
//! let algorithm = SigningAlgorithm::default();
//!
//! // Same bytes, same fingerprint.
//! let restored = SigningSecret::from_bytes(secret.expose_bytes()).unwrap();
//! assert_eq!(secret.key_id(), restored.key_id());
//! assert_eq!(algorithm.as_str(), "HS256");
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod algorithm;
mod error;
mod password;
mod secret;

pub use algorithm::SigningAlgorithm;
pub use error::{CryptoError, CryptoResult};
pub use password::{MAX_PASSWORD_LENGTH, hash_password, validate_password, verify_password};
pub use secret::{KeyId, MIN_SECRET_LENGTH, SigningSecret};

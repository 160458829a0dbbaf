//! Prelude module - commonly used types for convenient import.
//!
//! Use `use docshare_crypto::prelude::*;` to import all essential types.

// Errors
pub use crate::{CryptoError, CryptoResult};

// Keys
pub use crate::{KeyId, SigningAlgorithm, SigningSecret};

// Passwords
pub use crate::{hash_password, validate_password, verify_password};

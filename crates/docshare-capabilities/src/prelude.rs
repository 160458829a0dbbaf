//! Prelude module - commonly used types for convenient import.
//!
//! Use `use docshare_capabilities::prelude::*;` to import all essential types.

// Errors
pub use crate::{TokenError, TokenResult, VerifyOutcome};

// Claims and tokens
pub use crate::{Claim, IssuedToken};

// Issuing and verifying
pub use crate::{CapabilityIssuer, TokenAuthority, TokenConfig, TokenPurpose, TtlPolicy};

// Time
pub use crate::{Clock, FixedClock, SystemClock};

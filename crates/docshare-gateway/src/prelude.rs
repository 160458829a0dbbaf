//! Prelude module - commonly used types for convenient import.
//!
//! Use `use docshare_gateway::prelude::*;` to import all essential types.

// Errors
pub use crate::{GatewayError, GatewayResult};

// Service
pub use crate::{FileShareService, ServiceSettings};

// Responses
pub use crate::{AccessToken, Download, DownloadLink, SignupResponse};

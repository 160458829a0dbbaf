//! Prelude module - commonly used types for convenient import.
//!
//! Use `use docshare_telemetry::prelude::*;` to import all essential types.

// Errors
pub use crate::{TelemetryError, TelemetryResult};

// Logging
pub use crate::{FileRotation, LogConfig, LogFormat, LogTarget, setup_logging};

// Request context
pub use crate::RequestContext;

//! Docshare Telemetry - Logging and request context.
//!
//! This crate provides:
//! - Configurable `tracing` subscriber setup (pretty, compact, JSON, full;
//!   stdout, stderr, or rolling files)
//! - [`RequestContext`] for correlating the log lines of one service call
//!
//! # Example
//!
//! ```rust,no_run
//! use docshare_telemetry::{LogConfig, LogFormat, RequestContext, setup_logging};
//!
//! # fn main() -> Result<(), docshare_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("docshare_capabilities=debug");
//! setup_logging(&config)?;
//!
//! let ctx = RequestContext::new("secure_download").with_user_id(42);
//! let span = ctx.span();
//! let _guard = span.enter();
//! tracing::info!("serving file");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::RequestContext;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};

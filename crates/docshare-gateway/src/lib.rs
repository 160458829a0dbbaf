//! Docshare Gateway - the transport-agnostic file-sharing service.
//!
//! [`FileShareService`] ties accounts, file metadata, uploaded bytes and
//! capability tokens together:
//!
//! - **Accounts**: signup with an email verification link, verification,
//!   login returning a session bearer, bearer authentication
//! - **Files**: ops upload documents; clients list them, request a
//!   download link bound to themselves, and redeem it
//!
//! Every failure is a [`GatewayError`] with an HTTP-style status and a
//! client-safe message; an HTTP layer only has to map those onto responses.
//! [`config_bridge::from_config`] assembles a service from
//! `docshare_config::Config`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod config_bridge;
pub mod error;
pub mod response;
pub mod service;
pub mod settings;

mod accounts;
mod files;

pub use error::{ACCESS_DENIED, GatewayError, GatewayResult, INVALID_CREDENTIALS};
pub use response::{AccessToken, Download, DownloadLink, SignupResponse};
pub use service::FileShareService;
pub use settings::ServiceSettings;

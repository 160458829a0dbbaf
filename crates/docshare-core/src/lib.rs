//! Docshare Core - Foundation types for the docshare file-sharing backend.
//!
//! This crate provides:
//! - Strongly typed identifiers for users and files
//! - A UTC [`Timestamp`] wrapper with whole-second helpers
//! - User roles and the metadata records kept for users and files
//!
//! It has no knowledge of tokens, storage engines or transports; those live
//! in `docshare-capabilities`, `docshare-storage` and `docshare-gateway`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod error;
pub mod records;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use records::{FileRecord, FileSummary, NewFile, NewUser, UserRecord};
pub use types::{FileId, Role, Timestamp, UserId};
